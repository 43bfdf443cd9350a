//! The greeting flow: capture, encode, match, then greet or enroll.

use crate::config::Config;
use crate::dialog::{self, Dialog, DialogData};
use greeter_core::{Encoding, FaceComparator, FaceEncoder, PersonRegistry, RegistryError};
use greeter_hw::{CameraSource, Frame, FrameAcquirer, V4lCamera};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Outcome of one greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Greeting {
    /// Known people were recognized, in roster order.
    Recognized(Vec<String>),
    /// No frame, or no face in it.
    NoFace,
    /// A face was seen but the person gave no name.
    NameNotGiven,
    /// A new person was enrolled under this name.
    Introduced(String),
}

/// Greets people it knows and learns the ones it doesn't.
///
/// Owns the roster; the host constructs one instance at startup and routes
/// every greeting intent to [`handle_hello`](Self::handle_hello).
pub struct GreetingSkill<S, E, D> {
    registry: PersonRegistry,
    acquirer: FrameAcquirer<S>,
    encoder: E,
    comparator: Box<dyn FaceComparator>,
    dialog: D,
}

impl<E: FaceEncoder, D: Dialog> GreetingSkill<V4lCamera, E, D> {
    /// Build the skill from configuration: load the roster and set up the V4L2 camera.
    ///
    /// A corrupt roster fails startup.
    pub fn from_config(config: &Config, encoder: E, dialog: D) -> Result<Self, SkillError> {
        let registry = PersonRegistry::open(&config.roster_path)?;
        let acquirer = FrameAcquirer::new(V4lCamera::new(&config.camera_device, config.camera_fps))
            .with_max_attempts(config.capture_attempts)
            .with_retry_delay(config.retry_delay());

        tracing::info!(
            roster = %config.roster_path.display(),
            known = registry.len(),
            camera = %config.camera_device,
            metric = ?config.match_metric,
            tolerance = config.match_tolerance,
            "greeting skill initialized"
        );

        Ok(Self::new(registry, acquirer, encoder, config.comparator(), dialog))
    }
}

impl<S: CameraSource, E: FaceEncoder, D: Dialog> GreetingSkill<S, E, D> {
    pub fn new(
        registry: PersonRegistry,
        acquirer: FrameAcquirer<S>,
        encoder: E,
        comparator: Box<dyn FaceComparator>,
        dialog: D,
    ) -> Self {
        Self {
            registry,
            acquirer,
            encoder,
            comparator,
            dialog,
        }
    }

    pub fn registry(&self) -> &PersonRegistry {
        &self.registry
    }

    pub fn dialog(&self) -> &D {
        &self.dialog
    }

    /// Handle a greeting intent.
    ///
    /// Capture and detection failures degrade to the unknown-person greeting;
    /// only registration and persistence errors are returned.
    pub fn handle_hello(&mut self) -> Result<Greeting, SkillError> {
        let frame = self.acquirer.capture_frame();
        let encodings = frame.as_ref().and_then(|f| self.encode(f));
        let names = self
            .registry
            .match_names(encodings.as_deref(), self.comparator.as_ref());

        if !names.is_empty() {
            tracing::info!(?names, "recognized known persons");
            self.dialog
                .speak_dialog(dialog::KNOWN_PERSON_GREETING, &dialog::name_data(names.join(", ")));
            return Ok(Greeting::Recognized(names));
        }

        self.dialog
            .speak_dialog(dialog::UNKNOWN_PERSON_GREETING, &DialogData::new());

        match encodings {
            Some(encodings) if !encodings.is_empty() => self.handle_unknown_person(&encodings),
            _ => {
                tracing::debug!(frame = frame.is_some(), "no face to recognize");
                Ok(Greeting::NoFace)
            }
        }
    }

    fn handle_unknown_person(&mut self, encodings: &[Encoding]) -> Result<Greeting, SkillError> {
        self.dialog
            .speak_dialog(dialog::DONT_RECOGNIZE_YOU, &DialogData::new());

        let name = match self.dialog.get_response(dialog::ASK_FOR_NAME) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                tracing::info!("unknown person gave no name");
                return Ok(Greeting::NameNotGiven);
            }
        };

        self.registry.add_person(&name, encodings)?;
        self.dialog
            .speak_dialog(dialog::NICE_TO_MEET_YOU, &dialog::name_data(name.as_str()));
        Ok(Greeting::Introduced(name))
    }

    fn encode(&mut self, frame: &Frame) -> Option<Vec<Encoding>> {
        match self.encoder.encodings(&frame.data, frame.width, frame.height) {
            Ok(encodings) => {
                tracing::debug!(faces = encodings.len(), "encoded frame");
                Some(encodings)
            }
            Err(e) => {
                tracing::warn!(error = %e, "face encoding failed");
                None
            }
        }
    }
}
