use std::net::{AddrParseError, IpAddr, Ipv4Addr};
use std::path::Path;

use crate::error::{Result, SyncError};

/// Addresses of the displays deployed on the station network
const DEPLOYED_NTDS: [Ipv4Addr; 8] = [
    Ipv4Addr::new(172, 16, 26, 3),
    Ipv4Addr::new(172, 16, 26, 4),
    Ipv4Addr::new(172, 16, 26, 9),
    Ipv4Addr::new(172, 17, 26, 10),
    Ipv4Addr::new(172, 16, 26, 12),
    Ipv4Addr::new(172, 16, 26, 7),
    Ipv4Addr::new(172, 16, 26, 15),
    Ipv4Addr::new(172, 17, 26, 16),
];

/// The set of displays a loop distributes time to
///
/// Order is kept for reporting only; delivery is concurrent and unordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRoster {
    devices: Vec<IpAddr>,
}

impl DeviceRoster {
    /// Create a roster, dropping repeated addresses
    #[must_use]
    pub fn new(devices: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut unique: Vec<IpAddr> = Vec::new();
        for device in devices {
            if !unique.contains(&device) {
                unique.push(device);
            }
        }
        Self { devices: unique }
    }

    /// The roster of the deployed installation
    #[must_use]
    pub fn deployed() -> Self {
        Self::new(DEPLOYED_NTDS.iter().copied().map(IpAddr::V4))
    }

    /// Parse a roster from textual addresses
    ///
    /// # Errors
    ///
    /// Returns `AddrParseError` for the first entry that is not an IP address.
    pub fn parse<'a>(
        entries: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<Self, AddrParseError> {
        let devices = entries
            .into_iter()
            .map(|entry| entry.trim().parse())
            .collect::<std::result::Result<Vec<IpAddr>, _>>()?;
        Ok(Self::new(devices))
    }

    /// Load a roster file with one address per line
    ///
    /// Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Io` if the file cannot be read, or
    /// `SyncError::InvalidConfig` naming the first line that is not an IP
    /// address.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;

        let mut devices = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            let device = entry.parse().map_err(|e| SyncError::InvalidConfig {
                name: "roster".to_string(),
                message: format!("line {}: {entry:?}: {e}", index + 1),
            })?;
            devices.push(device);
        }

        tracing::debug!(path = %path.as_ref().display(), devices = devices.len(), "Roster loaded");
        Ok(Self::new(devices))
    }

    /// Iterate over device addresses
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.devices.iter()
    }

    /// Device addresses as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[IpAddr] {
        &self.devices
    }

    /// Number of devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if roster is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Check if a device is on the roster
    #[must_use]
    pub fn contains(&self, device: &IpAddr) -> bool {
        self.devices.contains(device)
    }
}

impl Default for DeviceRoster {
    fn default() -> Self {
        Self::deployed()
    }
}

impl FromIterator<IpAddr> for DeviceRoster {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a DeviceRoster {
    type Item = &'a IpAddr;
    type IntoIter = std::slice::Iter<'a, IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
