//! Message protection against an open context.

use tokenseal_proto::Token;

use crate::{
    context::SecurityContext, error::ProtectionError, provider::SecurityProvider,
    status::StatusCode,
};

/// Produce a protected token for `plaintext`.
///
/// Returns the token and whether the mechanism actually encrypted the
/// payload. Confidentiality that was requested but not applied is logged as
/// a warning; the caller decides whether to proceed.
pub fn protect<P: SecurityProvider>(
    context: &mut SecurityContext<'_, P>,
    plaintext: &[u8],
    request_confidentiality: bool,
) -> Result<(Token, bool), ProtectionError> {
    let (provider, handle) = open_parts(context)?;

    let wrapped = provider
        .wrap(handle, plaintext, request_confidentiality)
        .map_err(ProtectionError::ProviderRejected)?;

    if request_confidentiality && !wrapped.confidential {
        tracing::warn!("message not encrypted");
    }
    tracing::debug!(
        plaintext_len = plaintext.len(),
        token_len = wrapped.token.len(),
        confidential = wrapped.confidential,
        "message protected"
    );

    Ok((wrapped.token, wrapped.confidential))
}

/// Validate a detached integrity token over `plaintext`.
///
/// Any validation failure (bad signature, corrupted or replayed token) is
/// reported as [`ProtectionError::IntegrityFailed`].
pub fn verify<P: SecurityProvider>(
    context: &mut SecurityContext<'_, P>,
    plaintext: &[u8],
    token: &[u8],
) -> Result<(), ProtectionError> {
    let (provider, handle) = open_parts(context)?;

    provider.verify_mic(handle, plaintext, token).map_err(classify)?;

    tracing::debug!(plaintext_len = plaintext.len(), "signature verified");
    Ok(())
}

fn open_parts<'a, P: SecurityProvider>(
    context: &'a mut SecurityContext<'_, P>,
) -> Result<(&'a mut P, &'a mut P::Context), ProtectionError> {
    let state = context.state();
    if !context.is_open() {
        return Err(ProtectionError::ContextNotOpen { state });
    }
    context.parts_mut().ok_or(ProtectionError::ContextNotOpen { state })
}

fn classify(status: StatusCode) -> ProtectionError {
    if status.major.is_integrity_failure() {
        ProtectionError::IntegrityFailed(status)
    } else {
        ProtectionError::ProviderRejected(status)
    }
}

#[cfg(test)]
mod tests {
    use tokenseal_proto::{ContextFlags, Oid};

    use super::*;
    use crate::{
        context::ContextState,
        provider::{ContextInfo, ContextStep, StepStatus, Wrapped},
        status::MajorStatus,
    };

    /// Single-step provider that counts message operations.
    #[derive(Debug, Default)]
    struct CountingProvider {
        wraps: usize,
        verifies: usize,
    }

    impl SecurityProvider for CountingProvider {
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
            *context = Some(());
            ContextStep { status: StepStatus::Complete, output: Token::empty(), granted: flags }
        }

        fn wrap(
            &mut self,
            _context: &mut (),
            message: &[u8],
            _confidential: bool,
        ) -> Result<Wrapped, StatusCode> {
            self.wraps += 1;
            Ok(Wrapped { token: Token::from(message.to_vec()), confidential: false })
        }

        fn verify_mic(
            &mut self,
            _context: &mut (),
            _message: &[u8],
            _token: &[u8],
        ) -> Result<(), StatusCode> {
            self.verifies += 1;
            Ok(())
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
    fn protection_requires_created_context() {
        let mut provider = CountingProvider::default();
        let mut context = SecurityContext::new(&mut provider);

        let err = protect(&mut context, b"hello", false).unwrap_err();
        assert!(matches!(err, ProtectionError::ContextNotOpen { state: ContextState::NotCreated }));
        let err = verify(&mut context, b"hello", b"mic").unwrap_err();
        assert!(matches!(err, ProtectionError::ContextNotOpen { state: ContextState::NotCreated }));

        drop(context);
        assert_eq!((provider.wraps, provider.verifies), (0, 0));
    }

    #[test]
    fn protection_stops_after_release() {
        let mut provider = CountingProvider::default();
        let mut context = SecurityContext::new(&mut provider);
        let target = "svc".to_string();
        let step = context.init_step(&target, None, ContextFlags::INTEG, None);
        context.mark_open(step.granted);

        protect(&mut context, b"hello", false).unwrap();
        verify(&mut context, b"hello", b"mic").unwrap();

        context.release();
        let err = protect(&mut context, b"hello", false).unwrap_err();
        assert!(matches!(err, ProtectionError::ContextNotOpen { state: ContextState::Closed }));
        let err = verify(&mut context, b"hello", b"mic").unwrap_err();
        assert!(matches!(err, ProtectionError::ContextNotOpen { state: ContextState::Closed }));

        drop(context);
        assert_eq!((provider.wraps, provider.verifies), (1, 1));
    }

    #[test]
    fn integrity_statuses_become_integrity_failures() {
        let err = classify(StatusCode::new(MajorStatus::BadMic, 1));
        assert!(matches!(err, ProtectionError::IntegrityFailed(_)));

        let err = classify(StatusCode::new(MajorStatus::DuplicateToken, 0));
        assert!(matches!(err, ProtectionError::IntegrityFailed(_)));
    }

    #[test]
    fn other_statuses_stay_provider_rejections() {
        let err = classify(StatusCode::from(MajorStatus::ContextExpired));
        assert!(matches!(err, ProtectionError::ProviderRejected(_)));
    }
}
