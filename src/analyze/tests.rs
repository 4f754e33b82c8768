use crate::analyze;
use color_eyre::eyre::{Report, Result};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn count_iterations() -> Result<(), Report> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "#iter\tlnL")?;
    for i in 0..10 {
        writeln!(file, "{i}\t-1234.5")?;
    }
    assert_eq!(analyze::count_iterations(&file.path())?, 10);
    Ok(())
}

#[test]
fn empty_trace() -> Result<(), Report> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "#iter\tlnL")?;
    assert!(analyze::count_iterations(&file.path()).is_err());
    Ok(())
}

fn meandiffsel_line(site: usize, probabilities: &[f64]) -> String {
    let mut fields = vec![site.to_string()];
    fields.extend(probabilities.iter().map(|p| p.to_string()));
    fields.join("\t")
}

#[test]
fn site_maxes() -> Result<(), Report> {
    let mut file = NamedTempFile::new()?;
    let mut probabilities = vec![0.01; analyze::AMINO_ACID_COLUMNS];
    probabilities[7] = 0.95;
    writeln!(file, "{}", meandiffsel_line(0, &probabilities))?;
    probabilities[7] = 0.01;
    probabilities[19] = 0.42;
    writeln!(file, "{}", meandiffsel_line(1, &probabilities))?;

    let maxes = analyze::read_site_maxes(&file.path())?;
    assert_eq!(maxes, vec![0.95, 0.42]);
    Ok(())
}

#[test]
fn truncated_meandiffsel() -> Result<(), Report> {
    let mut file = NamedTempFile::new()?;
    // one probability column short
    writeln!(file, "{}", meandiffsel_line(0, &vec![0.05; analyze::AMINO_ACID_COLUMNS - 1]))?;
    assert!(analyze::read_site_maxes(&file.path()).is_err());
    Ok(())
}

#[test]
fn missing_readdiffsel_executable() {
    let result =
        analyze::run_readdiffsel("/no/such/readdiffsel".as_ref(), 10, 50, "chain".as_ref());
    assert!(result.is_err());
}

#[cfg(unix)]
#[test]
fn failing_readdiffsel() -> Result<(), Report> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let script = dir.path().join("readdiffsel");
    std::fs::write(&script, "#!/bin/sh\necho 'chain not found' >&2\nexit 1\n")?;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

    let result = analyze::run_readdiffsel(&script, 10, 50, "chain".as_ref());
    assert!(result.is_err());
    let message = format!("{:?}", result.unwrap_err());
    assert!(message.contains("readdiffsel exited with"));
    Ok(())
}

#[test]
fn site_table_is_zero_based() -> Result<(), Report> {
    let table = analyze::site_table(&[0.9, 0.2])?;
    assert_eq!(table.headers, ["Sites", "Diffsel"]);
    assert_eq!(table.get_column("Sites")?, ["0", "1"]);
    assert_eq!(table.get("Diffsel", 0)?, "0.9");
    Ok(())
}
