use std::sync::Arc;

use oncointeract_contracts::analysis::VisualizationKey;
use oncointeract_contracts::events::{Event, EventWriter};

use crate::oracle::ImageOracle;

pub const IMAGE_SYSTEM_INSTRUCTION: &str = "You are a scientific illustrator using PyMOL visualization standards. Render protein structures using 'Thick Cartoon' representation (Helices as coiled ribbons, Beta sheets as arrows). Color Scheme: Teal and Blue. Ligand: Ball-and-Stick (Carbon=Grey, Oxygen=Red, Nitrogen=Blue). Background: Neutral Grey. Include text labels for key residues.";

/// Image generation that never fails outward: any error becomes an empty
/// payload plus an `image_failed` event. Each call is its own fault domain.
#[derive(Clone)]
pub struct ImageClient {
    oracle: Arc<dyn ImageOracle>,
    events: Option<EventWriter>,
}

impl ImageClient {
    pub fn new(oracle: Arc<dyn ImageOracle>, events: Option<EventWriter>) -> Self {
        Self { oracle, events }
    }

    pub fn model(&self) -> &str {
        self.oracle.name()
    }

    /// Base64 image for `prompt`, or `""` on any failure.
    pub fn generate(&self, epoch: u64, key: VisualizationKey, prompt: &str) -> String {
        let error = match self.oracle.render(prompt, IMAGE_SYSTEM_INSTRUCTION) {
            Ok(Some(payload)) if !payload.is_empty() => return payload,
            Ok(_) => "response carried no inline image".to_string(),
            Err(err) => err.to_string(),
        };
        if let Some(events) = self.events.as_ref() {
            let _ = events.record_cycle(
                epoch,
                &Event::ImageFailed {
                    key,
                    model: Some(self.oracle.name().to_string()),
                    error,
                },
            );
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use oncointeract_contracts::analysis::VisualizationKey;
    use oncointeract_contracts::events::EventWriter;
    use serde_json::Value;

    use super::{ImageClient, IMAGE_SYSTEM_INSTRUCTION};
    use crate::oracle::{ImageOracle, OracleError};

    struct FixedOracle(Result<Option<String>, u16>);

    impl ImageOracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        fn render(
            &self,
            _prompt: &str,
            system_instruction: &str,
        ) -> Result<Option<String>, OracleError> {
            assert_eq!(system_instruction, IMAGE_SYSTEM_INSTRUCTION);
            self.0.clone().map_err(|status| OracleError::Api {
                provider: "Gemini".to_string(),
                status,
                body: "quota exhausted".to_string(),
            })
        }
    }

    #[test]
    fn failures_become_empty_payloads() {
        let generate = |reply: Result<Option<String>, u16>| {
            ImageClient::new(Arc::new(FixedOracle(reply)), None).generate(
                1,
                VisualizationKey::MolecularViz,
                "p",
            )
        };
        assert_eq!(generate(Ok(Some("abc".into()))), "abc");
        assert_eq!(generate(Ok(Some(String::new()))), "");
        assert_eq!(generate(Ok(None)), "");
        assert_eq!(generate(Err(429)), "");
    }

    #[test]
    fn client_logs_failures_with_key_and_epoch() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let client = ImageClient::new(
            Arc::new(FixedOracle(Err(429))),
            Some(EventWriter::new(&path, "s")),
        );

        assert_eq!(client.generate(3, VisualizationKey::PathwayMap, "p"), "");

        let raw = std::fs::read_to_string(&path)?;
        let event: Value = serde_json::from_str(raw.lines().next().unwrap_or(""))?;
        assert_eq!(event["type"], Value::from("image_failed"));
        assert_eq!(event["key"], Value::from("pathwayMap"));
        assert_eq!(event["epoch"], Value::from(3));
        assert_eq!(event["model"], Value::from("fixed"));
        assert!(event["error"].as_str().unwrap_or("").contains("429"));
        Ok(())
    }

    #[test]
    fn client_returns_payload_without_logging() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let client = ImageClient::new(
            Arc::new(FixedOracle(Ok(Some("iVBOR".into())))),
            Some(EventWriter::new(&path, "s")),
        );
        assert_eq!(client.generate(1, VisualizationKey::MolecularViz, "p"), "iVBOR");
        assert!(!path.exists());
        Ok(())
    }
}
