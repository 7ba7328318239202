use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::code::Code;
use super::info::{Info, MetadataValue};
use super::unit::Unit;
use crate::isomme::Isomme;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a channel collection from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json` – collection document, see [`CollectionFile`]
/// * `.csv`  – shared `time` column plus one column per channel, header `CODE [unit]`
pub fn load_file(path: &Path) -> Result<Isomme> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Write a collection as JSON, readable again by [`load_file`].
pub fn save_json(isomme: &Isomme, path: &Path) -> Result<()> {
    let file = CollectionFile::from(isomme);
    let text = serde_json::to_string_pretty(&file).context("serialising collection")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// On-disk collection document:
///
/// ```json
/// {
///   "test_number": "T001",
///   "test_info": [["Laboratory name", "Lab"], ["Test date", "2024-05-01"]],
///   "channel_info": [["Number of channels", 3]],
///   "channels": [
///     {
///       "code": "11HEAD0000H3ACXA",
///       "unit": "g0",
///       "time": [0.0, 0.0001, ...],
///       "values": [0.12, 0.14, ...],
///       "info": [["Name of the channel", "Head acceleration X"]]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CollectionFile {
    #[serde(default)]
    pub test_number: String,
    #[serde(default)]
    pub test_info: Info,
    #[serde(default)]
    pub channel_info: Info,
    #[serde(default)]
    pub channels: Vec<ChannelRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub time: Vec<f64>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub info: Info,
}

impl From<&Isomme> for CollectionFile {
    fn from(isomme: &Isomme) -> Self {
        CollectionFile {
            test_number: isomme.test_number.clone(),
            test_info: isomme.test_info.clone(),
            channel_info: isomme.channel_info.clone(),
            channels: isomme
                .iter()
                .map(|channel| ChannelRecord {
                    code: channel.code.to_string(),
                    unit: Some(channel.unit.symbol().to_string()),
                    time: channel.time().to_vec(),
                    values: channel.values().to_vec(),
                    info: channel.info.clone(),
                })
                .collect(),
        }
    }
}

impl ChannelRecord {
    fn into_channel(self) -> Result<Channel> {
        let code = Code::new(&self.code)?;
        let unit = self
            .unit
            .as_deref()
            .map(|u| Unit::parse_for_dimension(u, code.physical_dimension()))
            .transpose()
            .with_context(|| format!("{}: unit", self.code))?;
        let channel = Channel::new(code, self.time, self.values, unit)?;
        Ok(channel.with_info(self.info))
    }
}

fn load_json(path: &Path) -> Result<Isomme> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let file: CollectionFile = serde_json::from_str(&text).context("parsing JSON")?;

    let mut isomme = Isomme::new(file.test_number);
    isomme.test_info = file.test_info;
    isomme.channel_info = file.channel_info;
    for (i, record) in file.channels.into_iter().enumerate() {
        let channel = record
            .into_channel()
            .with_context(|| format!("Channel {i}"))?;
        isomme.push(channel);
    }
    Ok(isomme)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row `time,11HEAD0000H3ACXA [g0],...`, then one row per
/// time stamp. The unit suffix is optional. The test number is the file stem.
fn load_csv(path: &Path) -> Result<Isomme> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let time_idx = headers
        .iter()
        .position(|h| h == "time")
        .context("CSV missing 'time' column")?;
    let columns = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_idx)
        .map(|(i, h)| parse_header(h).map(|(code, unit)| (i, code, unit)))
        .collect::<Result<Vec<_>>>()?;

    let mut time = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        time.push(parse_cell(record.get(time_idx), row_no, "time")?);
        for (column, (idx, code, _)) in values.iter_mut().zip(&columns) {
            column.push(parse_cell(record.get(*idx), row_no, code.as_str())?);
        }
    }

    let test_number = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let mut isomme = Isomme::new(test_number);
    for ((_, code, unit), values) in columns.into_iter().zip(values) {
        let mut channel = Channel::new(code, time.clone(), values, unit)?;
        channel.info.push("Data source", MetadataValue::from(path.display().to_string()));
        isomme.push(channel);
    }
    Ok(isomme)
}

/// `"11HEAD0000H3ACXA [g0]"` → code and unit.
fn parse_header(header: &str) -> Result<(Code, Option<Unit>)> {
    let (code, unit) = match header.split_once('[') {
        Some((code, rest)) => {
            let unit = rest
                .strip_suffix(']')
                .with_context(|| format!("Header '{header}': unterminated unit"))?;
            (code.trim(), Some(unit.trim()))
        }
        None => (header, None),
    };
    let code = Code::new(code).with_context(|| format!("Header '{header}'"))?;
    let unit = unit
        .map(|u| Unit::parse_for_dimension(u, code.physical_dimension()))
        .transpose()
        .with_context(|| format!("Header '{header}'"))?;
    Ok((code, unit))
}

fn parse_cell(cell: Option<&str>, row: usize, col: &str) -> Result<f64> {
    let cell = cell.unwrap_or("").trim();
    cell.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{cell}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("rusty-isomme-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_json() {
        let path = temp_file(
            "collection.json",
            r#"{
                "test_number": "T001",
                "test_info": [["Laboratory name", "Lab"]],
                "channels": [
                    {"code": "11HEAD0000H3ACXA", "unit": "g", "time": [0.0, 0.001], "values": [1.0, 2.0],
                     "info": [["Name of the channel", "Head X"]]},
                    {"code": "11HEAD0000H3ACYA", "time": [0.0, 0.001], "values": [3.0, 4.0]}
                ]
            }"#,
        );
        let isomme = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(isomme.test_number, "T001");
        assert_eq!(isomme.len(), 2);
        assert_eq!(isomme.get_test_info(&["Laboratory name"]).and_then(|v| v.as_str()), Some("Lab"));
        let head_x = &isomme.channels()[0];
        assert_eq!(head_x.unit, Unit::standard_gravity());
        assert_eq!(head_x.get_info(&["Name*"]).and_then(|v| v.as_str()), Some("Head X"));
        assert_eq!(isomme.channels()[1].unit, Unit::standard_gravity());
    }

    #[test]
    fn test_load_csv() {
        let path = temp_file(
            "T002.csv",
            "time,11HEAD0000H3ACXA [g0],11NECKUP00H3FOZA\n0.0,1.0,10\n0.001,2.0,20\n",
        );
        let isomme = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(isomme.test_number.ends_with("T002"));
        assert_eq!(isomme.len(), 2);
        assert_eq!(isomme.channels()[1].code.as_str(), "11NECKUP00H3FOZA");
        assert_eq!(isomme.channels()[1].values(), &[10.0, 20.0]);
    }

    #[test]
    fn test_json_round_trip_file() {
        let mut isomme = Isomme::new("T003");
        isomme.test_info.push("Test date", "2024-05-01");
        isomme
            .add_sample_channel(
                "11CHST0000H3DSXC",
                (0.0, 0.01, 11),
                (0.0, 20.0),
                crate::data::channel::SampleMode::Linear,
                "mm",
            )
            .unwrap();
        let path = std::env::temp_dir().join(format!("rusty-isomme-{}-saved.json", std::process::id()));
        save_json(&isomme, &path).unwrap();
        let loaded = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.test_number, "T003");
        assert_eq!(loaded.channels(), isomme.channels());
        assert_eq!(loaded.channels()[0].unit, Unit::parse("mm").unwrap());
    }

    #[test]
    fn test_rejects_bad_input() {
        let path = temp_file("bad.csv", "time,11HEAD0000H3ACXA\n0.0,abc\n");
        assert!(load_file(&path).is_err());
        std::fs::remove_file(&path).ok();
        assert!(load_file(Path::new("collection.mme")).is_err());
        assert!(parse_header("11HEAD0000H3ACXA [g0").is_err());
    }
}
