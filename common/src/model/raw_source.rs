use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A deprecated or staging data connector that production cards should not
/// query directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSource {
    RawHex,
    RawStitch,
    RawFivetran,
    RawAirbyte,
    RawPortable,
    RawDataddo,
}

impl RawSource {
    pub const ALL: [RawSource; 6] = [
        RawSource::RawHex,
        RawSource::RawStitch,
        RawSource::RawFivetran,
        RawSource::RawAirbyte,
        RawSource::RawPortable,
        RawSource::RawDataddo,
    ];

    /// The literal text that marks a reference to this source in SQL.
    pub fn marker(self) -> &'static str {
        match self {
            RawSource::RawHex => "raw_hex",
            RawSource::RawStitch => "raw_stitch",
            RawSource::RawFivetran => "raw_fivetran",
            RawSource::RawAirbyte => "raw_airbyte",
            RawSource::RawPortable => "raw_portable",
            RawSource::RawDataddo => "raw_dataddo",
        }
    }
}

impl fmt::Display for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// One membership flag per known raw source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSourceFlags {
    pub raw_hex: bool,
    pub raw_stitch: bool,
    pub raw_fivetran: bool,
    pub raw_airbyte: bool,
    pub raw_portable: bool,
    pub raw_dataddo: bool,
}

impl RawSourceFlags {
    pub fn from_sources(sources: &BTreeSet<RawSource>) -> Self {
        let mut flags = RawSourceFlags::default();
        for source in sources {
            *flags.slot(*source) = true;
        }
        flags
    }

    pub fn get(&self, source: RawSource) -> bool {
        match source {
            RawSource::RawHex => self.raw_hex,
            RawSource::RawStitch => self.raw_stitch,
            RawSource::RawFivetran => self.raw_fivetran,
            RawSource::RawAirbyte => self.raw_airbyte,
            RawSource::RawPortable => self.raw_portable,
            RawSource::RawDataddo => self.raw_dataddo,
        }
    }

    pub fn any(&self) -> bool {
        RawSource::ALL.iter().any(|source| self.get(*source))
    }

    fn slot(&mut self, source: RawSource) -> &mut bool {
        match source {
            RawSource::RawHex => &mut self.raw_hex,
            RawSource::RawStitch => &mut self.raw_stitch,
            RawSource::RawFivetran => &mut self.raw_fivetran,
            RawSource::RawAirbyte => &mut self.raw_airbyte,
            RawSource::RawPortable => &mut self.raw_portable,
            RawSource::RawDataddo => &mut self.raw_dataddo,
        }
    }
}
