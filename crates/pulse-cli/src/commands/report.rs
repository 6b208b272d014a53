use std::path::Path;

use pulsegrid_history::HistoryStore;

use super::DataPaths;

pub fn report(data_dir: &Path) -> anyhow::Result<()> {
    let paths = DataPaths::new(data_dir);
    let history = HistoryStore::new(&paths.log).load()?;
    pulsegrid_report::write_report(&history, &paths.report)?;
    println!("Report generated: {}", paths.report.display());
    Ok(())
}
