//! Negotiation loop tests against a scripted provider.

use tokenseal_core::{
    ContextFlags, ContextInfo, ContextState, ContextStep, MajorStatus, NegotiationError,
    Negotiator, Oid, SecurityProvider, StatusCode, StepStatus, Token, Wrapped, establish_context,
};
use tokenseal_harness::{Event, EventLog, MemoryChannel, ScriptStep, ScriptedProvider};

fn tokens(items: &[&'static [u8]]) -> Vec<Token> {
    items.iter().map(|item| Token::from(*item)).collect()
}

fn complete(output: &[u8], granted: ContextFlags) -> ScriptStep {
    ScriptStep::Complete { output: output.to_vec(), granted }
}

#[test]
fn two_round_handshake_completes() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new(tokens(&[b"reply"]), events.clone());
    let granted = ContextFlags::MUTUAL | ContextFlags::REPLAY;
    let mut provider = ScriptedProvider::new(
        [ScriptStep::Continue(b"hello".to_vec()), complete(b"finish", granted)],
        events.clone(),
    );

    let (context, flags) =
        establish_context(&mut channel, &mut provider, "sign@server", ContextFlags::MUTUAL, None)
            .expect("handshake should complete");

    assert_eq!(flags, granted);
    assert_eq!(context.state(), ContextState::Open);
    assert_eq!(context.granted_flags(), granted);
    assert_eq!(channel.pending(), 0);

    // Nothing is received once the provider reports completion.
    let log = events.snapshot();
    let complete_at = log
        .iter()
        .position(|event| matches!(event, Event::Step { status: StepStatus::Complete, .. }))
        .expect("complete step recorded");
    assert!(!log[complete_at..].iter().any(|event| matches!(event, Event::Received(_))));

    let sent: Vec<Event> = events
        .snapshot()
        .into_iter()
        .filter(|event| matches!(event, Event::Sent(_)))
        .collect();
    assert_eq!(
        sent,
        vec![Event::Sent(Token::from(&b"hello"[..])), Event::Sent(Token::from(&b"finish"[..]))]
    );
}

#[test]
fn round_bound_is_enforced() {
    let events = EventLog::new();
    let inbound = vec![Token::from(&b"again"[..]); 10];
    let mut channel = MemoryChannel::new(inbound, events.clone());
    let mut provider =
        ScriptedProvider::repeating(ScriptStep::Continue(b"more".to_vec()), events.clone());

    let err = Negotiator::new(5)
        .establish(&mut channel, &mut provider, "svc", ContextFlags::empty(), None)
        .expect_err("handshake must not complete");

    assert!(matches!(err, NegotiationError::TooManyRounds { max: 5 }));
    assert_eq!(events.count(|event| matches!(event, Event::Step { .. })), 5);
    // No receive follows the last allowed step.
    assert_eq!(events.count(|event| matches!(event, Event::Received(_))), 4);
    assert_eq!(events.count(|event| *event == Event::Release), 1);
}

#[test]
fn stalled_peer_at_round_bound_is_too_many_rounds() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new([], events.clone());
    let mut provider =
        ScriptedProvider::repeating(ScriptStep::Continue(b"more".to_vec()), events.clone());

    let err = Negotiator::new(1)
        .establish(&mut channel, &mut provider, "svc", ContextFlags::empty(), None)
        .expect_err("handshake must not complete");

    assert!(matches!(err, NegotiationError::TooManyRounds { max: 1 }));
    assert_eq!(events.count(|event| matches!(event, Event::Sent(_))), 1);
    assert_eq!(events.count(|event| matches!(event, Event::Received(_))), 0);
    assert_eq!(events.count(|event| *event == Event::Release), 1);
}

#[test]
fn empty_outputs_are_never_sent() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new(tokens(&[b"challenge", b"more"]), events.clone());
    let mut provider = ScriptedProvider::new(
        [
            ScriptStep::Continue(b"hello".to_vec()),
            ScriptStep::Continue(Vec::new()),
            complete(b"", ContextFlags::REPLAY),
        ],
        events.clone(),
    );

    establish_context(&mut channel, &mut provider, "svc", ContextFlags::empty(), None)
        .expect("handshake should complete");

    // Every step with output produced exactly one send, and nothing else was
    // sent.
    let log = events.snapshot();
    let with_output =
        log.iter().filter(|event| matches!(event, Event::Step { output, .. } if !output.is_empty())).count();
    let sent = log.iter().filter(|event| matches!(event, Event::Sent(_))).count();
    assert_eq!(with_output, 1);
    assert_eq!(sent, 1);
    assert!(log.iter().all(|event| !matches!(event, Event::Sent(token) if token.is_empty())));
}

#[test]
fn failed_step_releases_context() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new(tokens(&[b"reply"]), events.clone());
    let rejected = StatusCode::new(MajorStatus::BadMic, 1);
    let mut provider = ScriptedProvider::new(
        [ScriptStep::Continue(b"hello".to_vec()), ScriptStep::Fail(rejected)],
        events.clone(),
    );

    let err = establish_context(&mut channel, &mut provider, "svc", ContextFlags::empty(), None)
        .expect_err("second step fails");

    assert!(matches!(err, NegotiationError::ProviderRejected(status) if status == rejected));
    assert_eq!(err.status(), Some(rejected));
    assert_eq!(events.count(|event| *event == Event::Release), 1);

    let last = events.snapshot().pop();
    assert_eq!(last, Some(Event::Release));
}

#[test]
fn bad_name_fails_before_any_step() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new([], events.clone());
    let mut provider =
        ScriptedProvider::new([ScriptStep::Continue(b"hello".to_vec())], events.clone());

    let err = establish_context(&mut channel, &mut provider, "", ContextFlags::empty(), None)
        .expect_err("empty name is rejected");

    assert!(matches!(err, NegotiationError::BadName(status) if status.major == MajorStatus::BadName));
    assert!(events.snapshot().is_empty());
}

#[test]
fn downgrade_is_not_an_error() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new([], events.clone());
    let mut provider =
        ScriptedProvider::new([complete(b"only", ContextFlags::REPLAY)], events.clone());

    let requested = ContextFlags::MUTUAL | ContextFlags::DELEG;
    let (_, granted) = establish_context(&mut channel, &mut provider, "svc", requested, None)
        .expect("downgrade still completes");

    assert_eq!(granted, ContextFlags::REPLAY);
    assert_eq!(granted.missing_from(requested | ContextFlags::REPLAY), requested);
}

#[test]
fn peer_hangup_mid_handshake_is_transport_error() {
    let events = EventLog::new();
    let mut channel = MemoryChannel::new([], events.clone());
    let mut provider =
        ScriptedProvider::new([ScriptStep::Continue(b"hello".to_vec())], events.clone());

    let err = establish_context(&mut channel, &mut provider, "svc", ContextFlags::empty(), None)
        .expect_err("no reply arrives");

    assert!(matches!(err, NegotiationError::Transport(ref e) if e.is_eof()));
    assert_eq!(err.status(), None);
    assert_eq!(events.count(|event| *event == Event::Release), 1);
}

/// Provider that completes in one step and records the flags it was given.
#[derive(Debug, Default)]
struct FlagRecorder {
    seen: Vec<ContextFlags>,
}

impl SecurityProvider for FlagRecorder {
    type Name = String;
    type Context = ();

    fn import_name(&mut self, name: &str) -> Result<String, StatusCode> {
        Ok(name.to_string())
    }

    fn init_step(
        &mut self,
        context: &mut Option<()>,
        _target: &String,
        _mechanism: Option<&Oid>,
        flags: ContextFlags,
        _input: Option<&[u8]>,
    ) -> ContextStep {
        self.seen.push(flags);
        *context = Some(());
        ContextStep { status: StepStatus::Complete, output: Token::empty(), granted: flags }
    }

    fn wrap(&mut self, _context: &mut (), _message: &[u8], _confidential: bool) -> Result<Wrapped, StatusCode> {
        Err(StatusCode::from(MajorStatus::Unavailable))
    }

    fn verify_mic(&mut self, _context: &mut (), _message: &[u8], _token: &[u8]) -> Result<(), StatusCode> {
        Err(StatusCode::from(MajorStatus::Unavailable))
    }

    fn inquire(&self, _context: &()) -> Result<ContextInfo, StatusCode> {
        Err(StatusCode::from(MajorStatus::Unavailable))
    }

    fn names_for_mech(&self, _mechanism: &Oid) -> Result<Vec<Oid>, StatusCode> {
        Ok(Vec::new())
    }

    fn release(&mut self, _context: ()) {}
}

#[test]
fn replay_detection_is_always_requested() {
    let mut provider = FlagRecorder::default();
    let mut channel = MemoryChannel::new([], EventLog::new());

    let (context, _) = establish_context(&mut channel, &mut provider, "svc", ContextFlags::CONF, None)
        .expect("single-step handshake");
    drop(context);

    assert_eq!(provider.seen, vec![ContextFlags::CONF | ContextFlags::REPLAY]);
}
