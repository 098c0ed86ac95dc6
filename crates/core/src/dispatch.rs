//! Chat Dispatch
//!
//! Every chat message passes through [`DispatchRouter::dispatch`]. Fixed
//! trigger phrases are checked first so that device actuation and emergency
//! alerts never depend on the language model; only unmatched messages reach
//! the [`TextOracle`].

use crate::{
    alert::{AlertSink, SosAlert},
    command::{CommandSignal, DeviceCommand},
    oracle::TextOracle,
    store::UserStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persona wrapped around every message forwarded to the oracle.
/// `{message}` is replaced by the user's raw text.
pub const DEFAULT_PERSONA_TEMPLATE: &str = "You are Sakhi, a friendly personal assistant robot. A user says: '{message}'. Respond in a helpful and concise manner.";

/// Name used in SOS alerts when the sender is not registered.
pub const UNKNOWN_USER_LABEL: &str = "A user";
pub const SOS_LOCATION: &str = "Location: Home";
pub const SOS_REPLY: &str = "Emergency alert triggered. I've notified your contacts.";

/// Actuation phrases in match order. The first hit wins.
const ACTUATION_TRIGGERS: &[(&str, DeviceCommand, &str)] = &[
    (
        "turn on the light",
        DeviceCommand::LedOn,
        "Okay, turning on the light.",
    ),
    (
        "turn off the light",
        DeviceCommand::LedOff,
        "Okay, turning off the light.",
    ),
    (
        "wave your hand",
        DeviceCommand::ServoWave,
        "Sure, waving my hand!",
    ),
];

const SOS_TRIGGERS: &[&str] = &["sos", "emergency"];

/// What a chat message asks the robot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Queue a command for the device and reply with a fixed acknowledgement.
    Actuate {
        command: DeviceCommand,
        reply: &'static str,
    },
    /// Raise an emergency alert.
    Sos,
    /// Hand the message to the language model.
    Converse,
}

/// Classifies a message by case-insensitive substring match.
pub fn classify(message: &str) -> Intent {
    let lowered = message.to_lowercase();

    if let Some(&(_, command, reply)) = ACTUATION_TRIGGERS
        .iter()
        .find(|(phrase, _, _)| lowered.contains(*phrase))
    {
        return Intent::Actuate { command, reply };
    }

    if SOS_TRIGGERS.iter().any(|phrase| lowered.contains(*phrase)) {
        return Intent::Sos;
    }

    Intent::Converse
}

/// Returned when a persona template would drop the user's message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("persona template must contain the {{message}} placeholder")]
pub struct InvalidPersonaTemplate;

/// Checks that `template` will carry the user's message into the prompt.
pub fn check_persona_template(template: &str) -> Result<(), InvalidPersonaTemplate> {
    if template.contains("{message}") {
        Ok(())
    } else {
        Err(InvalidPersonaTemplate)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Error with language model: {0}")]
    Oracle(#[source] anyhow::Error),
}

/// Routes chat messages to the command mailbox, the alert sink, or the oracle.
pub struct DispatchRouter {
    commands: Arc<CommandSignal>,
    users: Arc<dyn UserStore>,
    oracle: Arc<dyn TextOracle>,
    alerts: Arc<dyn AlertSink>,
    persona_template: String,
}

impl DispatchRouter {
    pub fn new(
        commands: Arc<CommandSignal>,
        users: Arc<dyn UserStore>,
        oracle: Arc<dyn TextOracle>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            commands,
            users,
            oracle,
            alerts,
            persona_template: DEFAULT_PERSONA_TEMPLATE.to_string(),
        }
    }

    /// Replaces the persona template. The template must contain `{message}`.
    pub fn with_persona_template(
        mut self,
        template: impl Into<String>,
    ) -> Result<Self, InvalidPersonaTemplate> {
        let template = template.into();
        check_persona_template(&template)?;
        self.persona_template = template;
        Ok(self)
    }

    /// Handles one chat message from `face_id` and returns the reply text.
    pub async fn dispatch(&self, face_id: &str, message: &str) -> Result<String, DispatchError> {
        match classify(message) {
            Intent::Actuate { command, reply } => {
                let pending = self.commands.peek();
                if pending != DeviceCommand::None {
                    info!(%pending, "Overwriting device command the device has not polled yet");
                }
                info!(%command, "Queueing device command");
                self.commands.set(command);
                Ok(reply.to_string())
            }
            Intent::Sos => {
                self.raise_sos(face_id).await;
                Ok(SOS_REPLY.to_string())
            }
            Intent::Converse => {
                debug!("No trigger phrase matched, forwarding to oracle");
                let prompt = self.persona_prompt(message);
                self.oracle
                    .generate(&prompt)
                    .await
                    .map_err(DispatchError::Oracle)
            }
        }
    }

    fn persona_prompt(&self, message: &str) -> String {
        self.persona_template.replace("{message}", message)
    }

    /// Sends the alert. Neither a failed lookup nor a failed delivery
    /// changes the reply the user hears.
    async fn raise_sos(&self, face_id: &str) {
        let user_name = match self.users.get(face_id).await {
            Ok(Some(user)) => user.name,
            Ok(None) => UNKNOWN_USER_LABEL.to_string(),
            Err(e) => {
                warn!(error = ?e, "User lookup failed during SOS; using generic label");
                UNKNOWN_USER_LABEL.to_string()
            }
        };

        let alert = SosAlert {
            user_name,
            location: SOS_LOCATION.to_string(),
        };
        info!(user = %alert.user_name, "Raising SOS alert");
        if let Err(e) = self.alerts.send_alert(&alert).await {
            warn!(error = ?e, "SOS alert delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        oracle::MockTextOracle,
        store::InMemoryUserStore,
        user::User,
    };
    use anyhow::{Result, anyhow, bail};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<SosAlert>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn send_alert(&self, alert: &SosAlert) -> Result<()> {
            self.sent.lock().unwrap().push(alert.clone());
            if self.fail {
                bail!("webhook down");
            }
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn get(&self, _face_id: &str) -> Result<Option<User>> {
            Err(anyhow!("database unreachable"))
        }

        async fn upsert(&self, _user: &User) -> Result<()> {
            Err(anyhow!("database unreachable"))
        }
    }

    struct Harness {
        router: DispatchRouter,
        commands: Arc<CommandSignal>,
        alerts: Arc<RecordingSink>,
    }

    fn harness_with(
        oracle: MockTextOracle,
        users: Arc<dyn UserStore>,
        alerts: RecordingSink,
    ) -> Harness {
        let commands = Arc::new(CommandSignal::new());
        let alerts = Arc::new(alerts);
        let router = DispatchRouter::new(
            commands.clone(),
            users,
            Arc::new(oracle),
            alerts.clone(),
        );
        Harness {
            router,
            commands,
            alerts,
        }
    }

    /// An oracle that fails the test if it is ever called.
    fn silent_oracle() -> MockTextOracle {
        let mut oracle = MockTextOracle::new();
        oracle.expect_generate().never();
        oracle
    }

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(
            classify("please turn on the light, sos"),
            Intent::Actuate {
                command: DeviceCommand::LedOn,
                reply: "Okay, turning on the light.",
            }
        );
        assert_eq!(classify("EMERGENCY, I fell"), Intent::Sos);
        assert_eq!(classify("what's the weather?"), Intent::Converse);
    }

    #[tokio::test]
    async fn test_actuation_triggers_set_command_without_oracle() {
        let cases = [
            ("Sakhi, TURN ON THE LIGHT now", DeviceCommand::LedOn, "Okay, turning on the light."),
            ("could you Turn Off The Light?", DeviceCommand::LedOff, "Okay, turning off the light."),
            ("wave your hand at grandma", DeviceCommand::ServoWave, "Sure, waving my hand!"),
        ];

        for (message, expected, ack) in cases {
            let h = harness_with(
                silent_oracle(),
                Arc::new(InMemoryUserStore::new()),
                RecordingSink::default(),
            );

            let reply = h.router.dispatch("face-1", message).await.unwrap();

            assert_eq!(reply, ack);
            assert_eq!(h.commands.drain(), expected);
            assert!(h.alerts.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_light_trigger_beats_sos() {
        let h = harness_with(
            silent_oracle(),
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        let reply = h
            .router
            .dispatch("face-1", "please turn on the light, sos")
            .await
            .unwrap();

        assert_eq!(reply, "Okay, turning on the light.");
        assert_eq!(h.commands.peek(), DeviceCommand::LedOn);
        assert!(h.alerts.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sos_uses_registered_name() {
        let users = Arc::new(InMemoryUserStore::new());
        users.upsert(&User::new("face-9", "Meera")).await.unwrap();
        let h = harness_with(silent_oracle(), users, RecordingSink::default());

        let reply = h.router.dispatch("face-9", "SOS!").await.unwrap();

        assert_eq!(reply, SOS_REPLY);
        assert_eq!(
            *h.alerts.sent.lock().unwrap(),
            vec![SosAlert {
                user_name: "Meera".into(),
                location: SOS_LOCATION.into(),
            }]
        );
        assert_eq!(h.commands.peek(), DeviceCommand::None);
    }

    #[tokio::test]
    async fn test_emergency_from_unregistered_user() {
        let h = harness_with(
            silent_oracle(),
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        let reply = h
            .router
            .dispatch("stranger", "this is an emergency")
            .await
            .unwrap();

        assert_eq!(reply, SOS_REPLY);
        let sent = h.alerts.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_name, UNKNOWN_USER_LABEL);
    }

    #[tokio::test]
    async fn test_sos_survives_lookup_and_delivery_failure() {
        let h = harness_with(
            silent_oracle(),
            Arc::new(FailingStore),
            RecordingSink {
                fail: true,
                ..Default::default()
            },
        );

        let reply = h.router.dispatch("face-1", "sos").await.unwrap();

        assert_eq!(reply, SOS_REPLY);
        assert_eq!(h.alerts.sent.lock().unwrap()[0].user_name, UNKNOWN_USER_LABEL);
    }

    #[tokio::test]
    async fn test_unmatched_message_goes_to_oracle_verbatim() {
        let message = "Tell me a joke about Tea";
        let expected_prompt = DEFAULT_PERSONA_TEMPLATE.replace("{message}", message);

        let mut oracle = MockTextOracle::new();
        oracle
            .expect_generate()
            .withf(move |prompt: &str| prompt == expected_prompt)
            .times(1)
            .returning(|_| Ok("Why did the tea go to school? To get steeped in knowledge.".into()));

        let h = harness_with(
            oracle,
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        let reply = h.router.dispatch("face-1", message).await.unwrap();

        assert_eq!(
            reply,
            "Why did the tea go to school? To get steeped in knowledge."
        );
        assert_eq!(h.commands.peek(), DeviceCommand::None);
    }

    #[tokio::test]
    async fn test_custom_persona_template() {
        let mut oracle = MockTextOracle::new();
        oracle
            .expect_generate()
            .withf(|prompt: &str| prompt == "Be brief. User: hello")
            .times(1)
            .returning(|_| Ok("Hi!".into()));

        let commands = Arc::new(CommandSignal::new());
        let router = DispatchRouter::new(
            commands,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(oracle),
            Arc::new(RecordingSink::default()),
        )
        .with_persona_template("Be brief. User: {message}")
        .unwrap();

        assert_eq!(router.dispatch("face-1", "hello").await.unwrap(), "Hi!");
    }

    #[tokio::test]
    async fn test_persona_template_without_placeholder_is_rejected() {
        let commands = Arc::new(CommandSignal::new());
        let router = DispatchRouter::new(
            commands,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(silent_oracle()),
            Arc::new(RecordingSink::default()),
        );

        let err = router
            .with_persona_template("You are Sakhi. Be kind.")
            .err()
            .unwrap();

        assert_eq!(err, InvalidPersonaTemplate);
        assert_eq!(
            err.to_string(),
            "persona template must contain the {message} placeholder"
        );
    }

    #[tokio::test]
    async fn test_default_persona_keeps_the_message() {
        let message = "what is my medicine schedule";
        let mut oracle = MockTextOracle::new();
        oracle
            .expect_generate()
            .withf(move |prompt: &str| prompt.contains(message))
            .times(1)
            .returning(|_| Ok("At 8 and 20.".into()));

        let h = harness_with(
            oracle,
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        assert_eq!(h.router.dispatch("face-1", message).await.unwrap(), "At 8 and 20.");
    }

    #[tokio::test]
    async fn test_blank_message_is_forwarded_to_oracle() {
        let expected_prompt = DEFAULT_PERSONA_TEMPLATE.replace("{message}", "   ");
        let mut oracle = MockTextOracle::new();
        oracle
            .expect_generate()
            .withf(move |prompt: &str| prompt == expected_prompt)
            .times(1)
            .returning(|_| Ok("I didn't catch that.".into()));

        let h = harness_with(
            oracle,
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        assert_eq!(
            h.router.dispatch("face-1", "   ").await.unwrap(),
            "I didn't catch that."
        );
    }

    #[tokio::test]
    async fn test_overwriting_pending_command() {
        let h = harness_with(
            silent_oracle(),
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        h.router.dispatch("face-1", "turn on the light").await.unwrap();
        h.router.dispatch("face-1", "wave your hand").await.unwrap();

        assert_eq!(h.commands.drain(), DeviceCommand::ServoWave);
        assert_eq!(h.commands.drain(), DeviceCommand::None);
    }

    #[tokio::test]
    async fn test_oracle_failure_is_surfaced() {
        let mut oracle = MockTextOracle::new();
        oracle
            .expect_generate()
            .times(1)
            .returning(|_| Err(anyhow!("quota exceeded")));

        let h = harness_with(
            oracle,
            Arc::new(InMemoryUserStore::new()),
            RecordingSink::default(),
        );

        let err = h.router.dispatch("face-1", "how are you?").await.unwrap_err();

        assert!(matches!(err, DispatchError::Oracle(_)));
        assert_eq!(err.to_string(), "Error with language model: quota exceeded");
    }
}
