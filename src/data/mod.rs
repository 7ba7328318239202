/// Data layer: channel codes, units, channels and loading.
///
/// Architecture:
/// ```text
///  .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Isomme (channels + test/channel info)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ channel   │  Code + Unit + Info + time series
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  CFC low-pass filtering
///   └──────────┘
/// ```
///
/// `code` validity and default units come from the `codebook`; `pattern`
/// provides the glob matching shared by codes and info labels.

pub mod channel;
pub mod code;
pub mod codebook;
pub mod filter;
pub mod info;
pub mod loader;
pub mod pattern;
pub mod unit;
