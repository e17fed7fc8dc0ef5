use crate::source::MemorySource;

/// Tab separated sample with one header row and nine data rows.
pub const SAMPLE_ROWS: &str = "\
city\tlast_name\tfirst_name
Paris\tDupont\tJeanne
Lyon\tMartin\tLouis
Marseille\tBernard\tCamille
Toulouse\tThomas\tHugo
Nice\tPetit\tChloe
Nantes\tRobert\tLeo
Strasbourg\tRichard\tManon
Montpellier\tDurand\tJules
Bordeaux\tDubois\tLina
";

/// Number of data rows in [`SAMPLE_ROWS`].
pub const SAMPLE_SIZE: usize = 9;

pub fn sample_source() -> MemorySource {
    MemorySource::from_text(SAMPLE_ROWS, '\t')
}

/// Writes [`SAMPLE_ROWS`] to a uniquely named file in the system temporary directory.
pub fn write_sample_file(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("flow-{}-{name}.tsv", std::process::id()));
    std::fs::write(&path, SAMPLE_ROWS).expect("failed to write sample source file");

    path
}
