use ampbridge_transport::AsyncLine;

use crate::error::{ControlError, Result};
use crate::media::MediaControl;

/// Firmware identification reported by `VER`, e.g. `20220805-a4e9-35`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FirmwareVersion {
    /// Build date of the firmware image.
    pub firmware: String,
    /// Abbreviated git revision.
    pub git: String,
    /// Command API level.
    pub api: String,
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.firmware, self.git, self.api)
    }
}

impl<T: AsyncLine<Message = String>> MediaControl<T> {
    pub async fn firmware_version(&self) -> Result<FirmwareVersion> {
        let param = self.query("VER").await?;
        parse_version(&param).ok_or_else(|| ControlError::no_match("VER", param.as_bytes()))
    }
}

fn parse_version(param: &str) -> Option<FirmwareVersion> {
    let mut parts = param.splitn(3, '-');
    let firmware = parts.next()?;
    let git = parts.next()?;
    let api = parts.next()?;
    if firmware.is_empty() || git.is_empty() || api.is_empty() {
        return None;
    }
    Some(FirmwareVersion {
        firmware: firmware.to_string(),
        git: git.to_string(),
        api: api.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{until_listening, MockLine};
    use ampbridge_transport::Flavor;

    #[test]
    fn test_parse_version_triple() {
        let version = parse_version("20220805-a4e9-35").unwrap();
        assert_eq!(version.firmware, "20220805");
        assert_eq!(version.git, "a4e9");
        assert_eq!(version.api, "35");
        assert_eq!(version.to_string(), "20220805-a4e9-35");
    }

    #[test]
    fn test_parse_version_rejects_partial() {
        assert!(parse_version("20220805-a4e9").is_none());
        assert!(parse_version("--").is_none());
        assert!(parse_version("").is_none());
    }

    #[tokio::test]
    async fn test_firmware_version_query() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());

        let task = tokio::spawn(async move { control.firmware_version().await });
        until_listening(&transport, 1).await;
        transport.inject("MCU+PAS+RAKOIT:VER:20220805-a4e9-35&");

        let version = task.await.unwrap().unwrap();
        assert_eq!(version.git, "a4e9");
        assert_eq!(transport.sent(), vec!["MCU+PAS+RAKOIT:VER&".to_string()]);
    }
}
