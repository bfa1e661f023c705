//! Scripted security provider.
//!
//! Plays back a fixed list of context steps and protects messages with a
//! transparent, key-free token format, so protocol tests can drive the
//! negotiator, protector and orchestrator without real cryptography.
//!
//! ```text
//! wrap token: "wrap" || confidential (1 byte) || message
//! mic token:  "mic:" || message
//! ```

use std::collections::VecDeque;

use tokenseal_core::{
    ContextFlags, ContextInfo, ContextStep, MajorStatus, Oid, SecurityProvider, StatusCode,
    StepStatus, Token, Wrapped,
};

use crate::events::{Event, EventLog};

const WRAP_PREFIX: &[u8] = b"wrap";
const MIC_PREFIX: &[u8] = b"mic:";

/// Integrity token the scripted provider accepts for `message`.
pub fn mock_mic(message: &[u8]) -> Token {
    Token::from([MIC_PREFIX, message].concat())
}

/// Decode a scripted wrap token into `(message, confidential)`.
pub fn mock_unwrap(token: &[u8]) -> Option<(Vec<u8>, bool)> {
    let rest = token.strip_prefix(WRAP_PREFIX)?;
    let (&confidential, message) = rest.split_first()?;
    Some((message.to_vec(), confidential == 1))
}

/// One scripted context step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Send `output` and wait for the peer's reply.
    Continue(Vec<u8>),
    /// Finish, sending `output` if non-empty.
    Complete {
        /// Final token (may be empty)
        output: Vec<u8>,
        /// Flags to grant
        granted: ContextFlags,
    },
    /// Fail with `status`.
    Fail(StatusCode),
}

/// Per-context state of the scripted provider.
#[derive(Debug, Default)]
pub struct ScriptedContext {
    rounds: usize,
    inputs: Vec<Token>,
    granted: ContextFlags,
    open: bool,
}

impl ScriptedContext {
    /// Steps taken so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Tokens fed into steps, in order.
    pub fn inputs(&self) -> &[Token] {
        &self.inputs
    }
}

/// Provider that plays back a script.
#[derive(Debug)]
pub struct ScriptedProvider {
    script: VecDeque<ScriptStep>,
    repeat: Option<ScriptStep>,
    confidential: bool,
    events: EventLog,
}

impl ScriptedProvider {
    /// Provider that plays `steps` once, then fails.
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>, events: EventLog) -> Self {
        Self { script: steps.into_iter().collect(), repeat: None, confidential: true, events }
    }

    /// Provider that answers every step with `step`.
    pub fn repeating(step: ScriptStep, events: EventLog) -> Self {
        Self { script: VecDeque::new(), repeat: Some(step), confidential: true, events }
    }

    /// Whether wrapping honors confidentiality requests.
    #[must_use]
    pub fn with_confidentiality(mut self, confidential: bool) -> Self {
        self.confidential = confidential;
        self
    }

    /// The shared event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn next_step(&mut self) -> ScriptStep {
        self.script
            .pop_front()
            .or_else(|| self.repeat.clone())
            .unwrap_or(ScriptStep::Fail(StatusCode::new(MajorStatus::Failure, u32::MAX)))
    }
}

impl SecurityProvider for ScriptedProvider {
    type Name = String;
    type Context = ScriptedContext;

    fn import_name(&mut self, name: &str) -> Result<String, StatusCode> {
        if name.is_empty() {
            return Err(StatusCode::from(MajorStatus::BadName));
        }
        Ok(name.to_string())
    }

    fn init_step(
        &mut self,
        context: &mut Option<ScriptedContext>,
        _target: &String,
        _mechanism: Option<&Oid>,
        _flags: ContextFlags,
        input: Option<&[u8]>,
    ) -> ContextStep {
        let context = context.get_or_insert_with(ScriptedContext::default);
        context.rounds += 1;
        if let Some(input) = input {
            context.inputs.push(Token::from(input.to_vec()));
        }

        let step = match self.next_step() {
            ScriptStep::Continue(output) => ContextStep {
                status: StepStatus::ContinueNeeded,
                output: Token::from(output),
                granted: ContextFlags::empty(),
            },
            ScriptStep::Complete { output, granted } => {
                context.granted = granted;
                context.open = true;
                ContextStep { status: StepStatus::Complete, output: Token::from(output), granted }
            },
            ScriptStep::Fail(status) => ContextStep::failure(status),
        };

        self.events.record(Event::Step { status: step.status, output: step.output.clone() });
        step
    }

    fn wrap(
        &mut self,
        _context: &mut ScriptedContext,
        message: &[u8],
        confidential: bool,
    ) -> Result<Wrapped, StatusCode> {
        self.events.record(Event::Wrap);
        let confidential = confidential && self.confidential;
        let token = [WRAP_PREFIX, &[u8::from(confidential)][..], message].concat();
        Ok(Wrapped { token: Token::from(token), confidential })
    }

    fn verify_mic(
        &mut self,
        _context: &mut ScriptedContext,
        message: &[u8],
        token: &[u8],
    ) -> Result<(), StatusCode> {
        self.events.record(Event::VerifyMic);
        if token == mock_mic(message).as_bytes() {
            Ok(())
        } else {
            Err(StatusCode::from(MajorStatus::BadMic))
        }
    }

    fn inquire(&self, context: &ScriptedContext) -> Result<ContextInfo, StatusCode> {
        Ok(ContextInfo {
            initiator: "scripted-initiator".to_string(),
            acceptor: "scripted-acceptor".to_string(),
            mechanism: Oid::PSK,
            flags: context.granted,
            expires_at: None,
            locally_initiated: true,
            open: context.open,
        })
    }

    fn names_for_mech(&self, _mechanism: &Oid) -> Result<Vec<Oid>, StatusCode> {
        Ok(vec![Oid::NT_HOSTBASED_SERVICE])
    }

    fn release(&mut self, _context: ScriptedContext) {
        self.events.record(Event::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_token_round_trips_through_mock_unwrap() {
        let mut provider = ScriptedProvider::new([], EventLog::new());
        let mut context = ScriptedContext::default();

        let wrapped = provider.wrap(&mut context, b"hello", true).unwrap();
        assert_eq!(mock_unwrap(&wrapped.token), Some((b"hello".to_vec(), true)));
    }

    #[test]
    fn confidentiality_can_be_refused() {
        let mut provider = ScriptedProvider::new([], EventLog::new()).with_confidentiality(false);
        let mut context = ScriptedContext::default();

        let wrapped = provider.wrap(&mut context, b"hello", true).unwrap();
        assert!(!wrapped.confidential);
    }

    #[test]
    fn exhausted_script_fails() {
        let mut provider = ScriptedProvider::new([], EventLog::new());
        let step = provider.init_step(&mut None, &"svc".to_string(), None, ContextFlags::empty(), None);
        assert!(matches!(step.status, StepStatus::Failure(_)));
    }
}
