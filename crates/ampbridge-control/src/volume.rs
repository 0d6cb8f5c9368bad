//! Volume, mute, and balance operations.
//!
//! The wire carries volume as an integer percentage; the API surface uses
//! `0.0..=1.0`. Balance is carried as `0..=200` around a center of 100 and
//! surfaces as `-1.0..=1.0`.

use ampbridge_transport::AsyncLine;

use crate::error::{ControlError, Result};
use crate::media::MediaControl;

impl<T: AsyncLine<Message = String>> MediaControl<T> {
    /// Current volume as a fraction of full scale.
    pub async fn volume(&self) -> Result<f32> {
        let param = self.query("VOL").await?;
        parse_percent("VOL", &param)
    }

    /// Set the volume and return the level the device settled on.
    pub async fn set_volume(&self, level: f32) -> Result<f32> {
        let formatted = (level * 100.0).round() as i32;
        let param = self.query_with_param("VOL", &formatted.to_string()).await?;
        parse_percent("VOL", &param)
    }

    pub async fn mute(&self) -> Result<bool> {
        let param = self.query("MUT").await?;
        parse_switch("MUT", &param)
    }

    pub async fn set_mute(&self, muted: bool) -> Result<bool> {
        let param = self
            .query_with_param("MUT", if muted { "1" } else { "0" })
            .await?;
        parse_switch("MUT", &param)
    }

    /// Flip the mute state and return the new one. The firmware takes `T` as
    /// a toggle parameter.
    pub async fn toggle_mute(&self) -> Result<bool> {
        let param = self.query_with_param("MUT", "T").await?;
        parse_switch("MUT", &param)
    }

    /// The configured volume ceiling, as a fraction of full scale.
    pub async fn max_volume(&self) -> Result<f32> {
        let param = self.query("MXV").await?;
        parse_percent("MXV", &param)
    }

    /// Stereo balance: `-1.0` full left, `0.0` centered, `1.0` full right.
    pub async fn balance(&self) -> Result<f32> {
        let param = self.query("BAL").await?;
        Ok(parse_percent("BAL", &param)? - 1.0)
    }
}

fn parse_percent(field: &'static str, param: &str) -> Result<f32> {
    let value: u32 = param
        .parse()
        .map_err(|_| ControlError::no_match(field, param.as_bytes()))?;
    Ok(value as f32 / 100.0)
}

fn parse_switch(field: &'static str, param: &str) -> Result<bool> {
    match param {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(ControlError::no_match(field, other.as_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{until_listening, MockLine};
    use ampbridge_transport::Flavor;

    fn control(transport: &MockLine<String>) -> MediaControl<MockLine<String>> {
        MediaControl::new(transport.clone())
    }

    #[tokio::test]
    async fn test_volume_reply_scales_to_fraction() {
        let transport = MockLine::new(Flavor::LineTcp);
        let control = control(&transport);

        let task = tokio::spawn(async move { control.volume().await });
        until_listening(&transport, 1).await;
        transport.inject("MCU+PAS+RAKOIT:VOL:50&");

        assert_eq!(task.await.unwrap().unwrap(), 0.50);
        assert_eq!(transport.sent(), vec!["MCU+PAS+RAKOIT:VOL&".to_string()]);
    }

    #[tokio::test]
    async fn test_set_volume_formats_percentage() {
        let transport = MockLine::new(Flavor::LineTcp);
        let control = control(&transport);

        let task = tokio::spawn(async move { control.set_volume(0.35).await });
        until_listening(&transport, 1).await;
        transport.inject("MCU+PAS+RAKOIT:VOL:35&");

        assert_eq!(task.await.unwrap().unwrap(), 0.35);
        assert_eq!(transport.sent(), vec!["MCU+PAS+RAKOIT:VOL:35&".to_string()]);
    }

    #[tokio::test]
    async fn test_toggle_mute_sends_toggle_parameter() {
        let transport = MockLine::new(Flavor::LineTcp);
        let control = control(&transport);

        let task = tokio::spawn(async move { control.toggle_mute().await });
        until_listening(&transport, 1).await;
        transport.inject("MCU+PAS+RAKOIT:MUT:1&");

        assert!(task.await.unwrap().unwrap());
        assert_eq!(transport.sent(), vec!["MCU+PAS+RAKOIT:MUT:T&".to_string()]);
    }

    #[tokio::test]
    async fn test_balance_is_centered_on_zero() {
        let transport = MockLine::new(Flavor::LineTcp);
        let control = control(&transport);

        let task = tokio::spawn(async move { control.balance().await });
        until_listening(&transport, 1).await;
        transport.inject("MCU+PAS+RAKOIT:BAL:100&");

        assert_eq!(task.await.unwrap().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_garbled_reply_surfaces_no_match() {
        let transport = MockLine::new(Flavor::LineTcp);
        let control = control(&transport);

        let task = tokio::spawn(async move { control.volume().await });
        until_listening(&transport, 1).await;
        transport.inject("MCU+PAS+RAKOIT:VOL:garbage&");

        assert!(matches!(
            task.await.unwrap(),
            Err(ControlError::NoMatch { field: "VOL", .. })
        ));
    }
}
