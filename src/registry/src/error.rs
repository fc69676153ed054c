use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{0} index has already been loaded")]
    DuplicateSpecies(String),

    #[error("{0} does not exist")]
    UnknownSpecies(String),

    #[error("Failed to open config file")]
    OpenConfig(#[source] std::io::Error),

    #[error("Error parsing config line {line} (no equals found). The format is: species = /path/to/index.bin")]
    MalformedConfigLine { line: usize },

    #[error("Duplicate config value specified for '{0}'")]
    DuplicateConfigEntry(String),

    #[error("No valid configurations found in file")]
    EmptyConfig,
}
