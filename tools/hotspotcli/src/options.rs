use strum::EnumString;

use hotspots::{Connectivity, NodataPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "kebab_case")]
pub enum NodataSelection {
    Data,
    Zero,
    Propagate,
}

impl From<NodataSelection> for NodataPolicy {
    fn from(selection: NodataSelection) -> Self {
        match selection {
            NodataSelection::Data => NodataPolicy::Data,
            NodataSelection::Zero => NodataPolicy::Zero,
            NodataSelection::Propagate => NodataPolicy::Propagate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "kebab_case")]
pub enum ConnectivitySelection {
    Four,
    Eight,
}

impl From<ConnectivitySelection> for Connectivity {
    fn from(selection: ConnectivitySelection) -> Self {
        match selection {
            ConnectivitySelection::Four => Connectivity::Four,
            ConnectivitySelection::Eight => Connectivity::Eight,
        }
    }
}
