use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use located_error::prelude::*;
use log::debug;

use crate::error::RegistryError;

/// Parse a species config file mapping species names to index files.
///
/// One `species = /path/to/index.bin` entry per line; `#` comments and
/// blank lines are ignored, values are whitespace-trimmed. Duplicate
/// species (case-insensitive) and empty configs are errors. Entries come
/// back in file order.
pub fn parse_species_config(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    use RegistryError::{DuplicateConfigEntry, EmptyConfig, MalformedConfigLine, OpenConfig};
    let loc_msg = || format!("While parsing species config '{}'", path.display());

    debug!("Loading config file '{}'", path.display());
    let reader = BufReader::new(File::open(path).map_err(OpenConfig).with_loc(loc_msg)?);

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.with_loc(loc_msg)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, value) = line
            .split_once('=')
            .ok_or(MalformedConfigLine { line: line_idx + 1 })
            .with_loc(loc_msg)?;
        let name = name.trim().to_string();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            return Err(MalformedConfigLine { line: line_idx + 1 }).with_loc(loc_msg);
        }

        if !seen.insert(name.to_lowercase()) {
            return Err(DuplicateConfigEntry(name)).with_loc(loc_msg);
        }
        entries.push((name, PathBuf::from(value)));
    }

    if entries.is_empty() {
        return Err(EmptyConfig).with_loc(loc_msg);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("indexes.conf");
        let mut file = File::create(&path)?;
        write!(file, "{content}")?;
        Ok((tmpdir, path))
    }

    #[test]
    fn parses_entries_in_order() -> Result<()> {
        let (_tmpdir, path) = write_config(
            "# production indexes\n\nhuman = /data/GRCh38.bin\nmouse=/data/GRCm38.bin\n",
        )?;
        let entries = parse_species_config(&path)?;
        assert_eq!(
            entries,
            vec![
                ("human".to_string(), PathBuf::from("/data/GRCh38.bin")),
                ("mouse".to_string(), PathBuf::from("/data/GRCm38.bin")),
            ]
        );
        Ok(())
    }

    #[test]
    fn rejects_duplicates() -> Result<()> {
        let (_tmpdir, path) = write_config("human = /a.bin\nHuman = /b.bin\n")?;
        let result = parse_species_config(&path);
        assert!(result.is_err_and(|e| {
            matches!(e.downcast_ref::<RegistryError>(), Some(RegistryError::DuplicateConfigEntry(_)))
        }));
        Ok(())
    }

    #[test]
    fn rejects_lines_without_equals() -> Result<()> {
        let (_tmpdir, path) = write_config("human /a.bin\n")?;
        let result = parse_species_config(&path);
        assert!(result.is_err_and(|e| {
            matches!(
                e.downcast_ref::<RegistryError>(),
                Some(RegistryError::MalformedConfigLine { line: 1 })
            )
        }));
        Ok(())
    }

    #[test]
    fn rejects_empty_configs() -> Result<()> {
        let (_tmpdir, path) = write_config("# nothing but comments\n\n")?;
        let result = parse_species_config(&path);
        assert!(result.is_err_and(|e| {
            matches!(e.downcast_ref::<RegistryError>(), Some(RegistryError::EmptyConfig))
        }));
        Ok(())
    }
}
