//! The per-cycle synchronization state machine.
//!
//! One call to [`SyncClient::run_cycle`] executes the middle of a poll
//! cycle: the interval sleep and the end-of-cycle state flush live in the
//! agent runtime, everything between is here.
//!
//! Recording branch:
//! 1. clear the pending-set flag
//! 2. if the connection just came back, re-upload the full ledger
//! 3. sample the motion source, append on detection
//! 4. checked in → post the sample and apply directives; otherwise check in
//!
//! Stopped branch: attempt check-in if needed, then poll the status handler
//! for `Record` / `New Set`.
//!
//! Network failures flip `has_internet` / `had_internet_before` to false and
//! never escape; the only errors that propagate are local storage failures
//! from rotation.

use std::time::Instant;

use watchpost_core::types::{DeviceSession, ObservationRecord};
use watchpost_ledger::Ledger;

use crate::backoff::Backoff;
use crate::directive::{Directive, DirectiveSet};
use crate::error::SyncError;
use crate::motion::MotionSource;
use crate::server::{CheckInOutcome, ServerApi};

/// Drives poll cycles against a server implementation.
pub struct SyncClient<S> {
    server: S,
    backoff: Backoff,
}

impl<S: ServerApi> SyncClient<S> {
    pub fn new(server: S, backoff: Backoff) -> Self {
        Self { server, backoff }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Execute one poll cycle, mutating `session` in place.
    ///
    /// While the backoff window holds, server contact is skipped entirely;
    /// sampling and ledger writes still happen.
    pub fn run_cycle(
        &mut self,
        session: &mut DeviceSession,
        ledger: &Ledger,
        motion: &mut dyn MotionSource,
    ) -> Result<(), SyncError> {
        let net_ready = self.backoff.ready(Instant::now());
        if !net_ready {
            tracing::debug!(
                "backing off server contact ({} consecutive failures)",
                self.backoff.consecutive_failures()
            );
        }

        if session.state.is_recording {
            self.recording_cycle(session, ledger, motion, net_ready)
        } else {
            self.stopped_cycle(session, ledger, net_ready)
        }
    }

    fn recording_cycle(
        &mut self,
        session: &mut DeviceSession,
        ledger: &Ledger,
        motion: &mut dyn MotionSource,
        net_ready: bool,
    ) -> Result<(), SyncError> {
        session.state.has_pending_set_while_stopped = false;

        // Reconnection recovery: the connection is back but the server missed
        // everything since it dropped, so re-upload the whole active ledger
        // before posting new samples.
        if session.state.has_internet && !session.state.had_internet_before && net_ready {
            self.reload_ledger(session, ledger);
        }

        let movement = motion.sample();
        let record = ObservationRecord::now(session.name().clone());
        if movement {
            // Append failure is fatal for this record but not for the cycle;
            // surface it and keep sampling.
            if let Err(err) = ledger.append(&record) {
                tracing::error!("could not append observation to ledger: {err}");
            }
        }

        if !net_ready {
            return Ok(());
        }

        if session.state.is_checked_in {
            let payload = record.sensor_payload(movement);
            match self.server.post_sample(&session.config.password, &payload) {
                Ok(directives) => {
                    self.backoff.record_success();
                    self.apply_sensor_directives(session, ledger, &directives)?;
                    session.state.has_internet = true;
                }
                Err(err) => {
                    tracing::warn!("no internet while recording, still going: {err}");
                    mark_offline(session);
                    self.backoff.record_failure(Instant::now());
                }
            }
        } else {
            self.attempt_check_in(session);
        }

        Ok(())
    }

    fn stopped_cycle(
        &mut self,
        session: &mut DeviceSession,
        ledger: &Ledger,
        net_ready: bool,
    ) -> Result<(), SyncError> {
        if !net_ready {
            return Ok(());
        }

        // One observed network failure is enough for this cycle; a failed
        // check-in skips the status poll instead of doubling the backoff.
        if !session.state.is_checked_in && !self.attempt_check_in(session) {
            return Ok(());
        }

        match self.server.device_status(session.name()) {
            Ok(directives) => {
                self.backoff.record_success();
                if directives.contains(Directive::Record) {
                    tracing::info!("server directed device to resume recording");
                    session.state.is_recording = true;
                }
                if directives.contains(Directive::NewSet)
                    && !session.state.has_pending_set_while_stopped
                {
                    tracing::info!("new set requested while stopped");
                    ledger.rotate(session.state.current_set)?;
                    session.state.current_set += 1;
                    session.state.has_pending_set_while_stopped = true;
                }
            }
            Err(err) => {
                tracing::warn!("not recording and no internet, still going: {err}");
                mark_offline(session);
                self.backoff.record_failure(Instant::now());
            }
        }

        Ok(())
    }

    /// Full-ledger re-upload after an outage. Upload failure leaves the
    /// session untouched so the next cycle retries; it never blocks sampling.
    fn reload_ledger(&mut self, session: &mut DeviceSession, ledger: &Ledger) {
        let content = match ledger.read_raw() {
            Ok(content) => content,
            Err(err) => {
                tracing::error!("could not read ledger for re-upload: {err}");
                return;
            }
        };
        let file_name = format!("{}.csv", session.name());
        match self
            .server
            .upload_ledger(&session.config.password, &file_name, &content)
        {
            Ok(()) => {
                tracing::info!("re-uploaded ledger after reconnection ({} bytes)", content.len());
                session.state.had_internet_before = true;
                self.backoff.record_success();
            }
            Err(err) => {
                tracing::warn!("ledger re-upload failed, will retry next cycle: {err}");
                self.backoff.record_failure(Instant::now());
            }
        }
    }

    /// Apply sensor-handler directives in the documented order.
    fn apply_sensor_directives(
        &mut self,
        session: &mut DeviceSession,
        ledger: &Ledger,
        directives: &DirectiveSet,
    ) -> Result<(), SyncError> {
        if directives.contains(Directive::StopRecording) {
            tracing::info!("server directed device to stop recording");
            session.state.is_recording = false;
        }
        if directives.contains(Directive::NewSet) {
            ledger.rotate(session.state.current_set)?;
            session.state.current_set += 1;
        }
        if directives.contains(Directive::WrongPassword) {
            tracing::warn!("server rejected password; not syncing but still recording locally");
        }
        if directives.contains(Directive::DeviceMissing) {
            tracing::warn!(
                "device {} is unknown to the server; check it in, still recording locally",
                session.name()
            );
        }
        Ok(())
    }

    /// One opportunistic check-in attempt. Safe to call every cycle while the
    /// device is unchecked; guarded by `is_checked_in` at the call sites.
    /// Returns whether the server was reached.
    fn attempt_check_in(&mut self, session: &mut DeviceSession) -> bool {
        match self
            .server
            .check_in(session.name(), &session.config.password)
        {
            Ok(CheckInOutcome::Accepted) => {
                tracing::info!("device {} checked in", session.name());
                session.state.is_checked_in = true;
                self.backoff.record_success();
                true
            }
            Ok(CheckInOutcome::AlreadyCheckedIn) => {
                tracing::warn!(
                    "device name {} already in use; not sending to server but still running locally",
                    session.name()
                );
                session.state.is_checked_in = false;
                self.backoff.record_success();
                true
            }
            Err(err) => {
                tracing::warn!("no internet while checking in, still going: {err}");
                mark_offline(session);
                self.backoff.record_failure(Instant::now());
                false
            }
        }
    }
}

/// The "just went offline" signal: both connectivity flags drop, which arms
/// the reconnection re-upload for the next successful cycle.
fn mark_offline(session: &mut DeviceSession) {
    session.state.has_internet = false;
    session.state.had_internet_before = false;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::time::Duration;

    use tempfile::TempDir;

    use watchpost_core::types::{DeviceConfig, DeviceName, DeviceState};

    use crate::directive::parse_directives;
    use crate::motion::ScriptedMotion;

    use super::*;

    /// Scripted server: each queue holds one response per expected call;
    /// an exhausted queue answers with the benign default.
    #[derive(Default)]
    pub(crate) struct MockServer {
        pub check_in: RefCell<VecDeque<Result<CheckInOutcome, SyncError>>>,
        pub sample: RefCell<VecDeque<Result<DirectiveSet, SyncError>>>,
        pub upload: RefCell<VecDeque<Result<(), SyncError>>>,
        pub status: RefCell<VecDeque<Result<DirectiveSet, SyncError>>>,
        pub calls: RefCell<Vec<&'static str>>,
    }

    pub(crate) fn net_down() -> SyncError {
        SyncError::Response {
            endpoint: "mock".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "server unreachable"),
        }
    }

    impl ServerApi for MockServer {
        fn check_in(&self, _: &DeviceName, _: &str) -> Result<CheckInOutcome, SyncError> {
            self.calls.borrow_mut().push("check_in");
            self.check_in
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(CheckInOutcome::Accepted))
        }

        fn post_sample(&self, _: &str, _: &str) -> Result<DirectiveSet, SyncError> {
            self.calls.borrow_mut().push("sample");
            self.sample
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(DirectiveSet::default()))
        }

        fn upload_ledger(&self, _: &str, _: &str, _: &str) -> Result<(), SyncError> {
            self.calls.borrow_mut().push("upload");
            self.upload.borrow_mut().pop_front().unwrap_or(Ok(()))
        }

        fn device_status(&self, _: &DeviceName) -> Result<DirectiveSet, SyncError> {
            self.calls.borrow_mut().push("status");
            self.status
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(DirectiveSet::default()))
        }
    }

    fn session() -> DeviceSession {
        DeviceSession::new(
            DeviceConfig {
                name: DeviceName::from("porch-cam"),
                host: "collector.local".to_string(),
                port: 8003,
                https: false,
                password: "secret-pw".to_string(),
                poll_interval_secs: 0.0,
            },
            DeviceState::default(),
        )
    }

    fn client(server: MockServer) -> SyncClient<MockServer> {
        // Zero base: backoff never blocks inside single-shot tests.
        SyncClient::new(server, Backoff::new(Duration::ZERO, Duration::ZERO))
    }

    fn ledger(root: &TempDir) -> Ledger {
        Ledger::open(root.path(), DeviceName::from("porch-cam")).expect("open ledger")
    }

    #[test]
    fn motion_true_appends_one_observation() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let mut client = client(MockServer::default());
        let mut session = session();

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("cycle");
        assert_eq!(ledger.len().expect("len"), 1);

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([false]))
            .expect("cycle");
        assert_eq!(ledger.len().expect("len"), 1, "no motion, no append");
    }

    #[test]
    fn server_failure_flips_flags_but_append_still_happened() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server.sample.borrow_mut().push_back(Err(net_down()));
        let mut client = client(server);
        let mut session = session();

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("cycle");

        assert!(!session.state.has_internet);
        assert!(!session.state.had_internet_before);
        assert_eq!(ledger.len().expect("len"), 1, "local append is unaffected");
    }

    #[test]
    fn new_set_while_recording_archives_set_one_and_moves_to_two() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server
            .sample
            .borrow_mut()
            .push_back(Ok(parse_directives("New Set")));
        let mut client = client(server);
        let mut session = session();

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("cycle");

        assert_eq!(session.state.current_set, 2);
        assert!(ledger.is_empty().expect("is_empty"));
        assert_eq!(ledger.archived_sets().expect("sets"), vec![1]);
        assert!(session.state.has_internet);
    }

    #[test]
    fn stop_recording_directive_stops_the_device() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server
            .sample
            .borrow_mut()
            .push_back(Ok(parse_directives("Stop Recording")));
        let mut client = client(server);
        let mut session = session();

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([false]))
            .expect("cycle");
        assert!(!session.state.is_recording);
    }

    #[test]
    fn rejection_directives_leave_recording_untouched() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server
            .sample
            .borrow_mut()
            .push_back(Ok(parse_directives("Wrong Password,Device does not exist")));
        let mut client = client(server);
        let mut session = session();

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("cycle");

        assert!(session.state.is_recording);
        assert!(session.state.has_internet);
        assert_eq!(ledger.len().expect("len"), 1);
    }

    #[test]
    fn record_directive_while_stopped_resumes_recording() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server
            .status
            .borrow_mut()
            .push_back(Ok(parse_directives("Record")));
        let mut client = client(server);
        let mut session = session();
        session.state.is_recording = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        assert!(session.state.is_recording);
    }

    #[test]
    fn new_set_while_stopped_rotates_once_until_flag_clears() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        {
            let mut status = server.status.borrow_mut();
            status.push_back(Ok(parse_directives("New Set")));
            status.push_back(Ok(parse_directives("New Set")));
        }
        let mut client = client(server);
        let mut session = session();
        session.state.is_recording = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        assert_eq!(session.state.current_set, 2);
        assert!(session.state.has_pending_set_while_stopped);

        // A repeated New Set while still stopped must not rotate again.
        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        assert_eq!(session.state.current_set, 2);
        assert_eq!(ledger.archived_sets().expect("sets"), vec![1]);
    }

    #[test]
    fn first_recording_cycle_clears_pending_set_flag() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let mut client = client(MockServer::default());
        let mut session = session();
        session.state.has_pending_set_while_stopped = true;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        assert!(!session.state.has_pending_set_while_stopped);
    }

    #[test]
    fn stopped_cycle_failure_flips_both_flags() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server.status.borrow_mut().push_back(Err(net_down()));
        let mut client = client(server);
        let mut session = session();
        session.state.is_recording = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        assert!(!session.state.has_internet);
        assert!(!session.state.had_internet_before);
    }

    #[test]
    fn reconnection_reuploads_before_posting() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        let mut client = client(server);
        let mut session = session();
        session.state.has_internet = true;
        session.state.had_internet_before = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("cycle");

        assert!(session.state.had_internet_before);
        let calls = client.server.calls.borrow().clone();
        assert_eq!(
            calls,
            vec!["upload", "sample"],
            "re-upload must precede the directive-carrying post"
        );
    }

    #[test]
    fn failed_reupload_leaves_flags_unchanged_and_still_samples() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server.upload.borrow_mut().push_back(Err(net_down()));
        let mut client = client(server);
        let mut session = session();
        session.state.has_internet = true;
        session.state.had_internet_before = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("cycle");

        assert!(
            !session.state.had_internet_before,
            "failed upload leaves the recovery armed for next cycle"
        );
        assert_eq!(ledger.len().expect("len"), 1, "sampling was not blocked");
    }

    #[test]
    fn already_checked_in_keeps_device_unchecked_and_recording_locally() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        {
            let mut check_in = server.check_in.borrow_mut();
            check_in.push_back(Ok(CheckInOutcome::AlreadyCheckedIn));
            check_in.push_back(Ok(CheckInOutcome::AlreadyCheckedIn));
        }
        let mut client = client(server);
        let mut session = session();
        session.state.is_checked_in = false;

        for _ in 0..2 {
            client
                .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
                .expect("cycle");
        }

        assert!(!session.state.is_checked_in);
        assert_eq!(ledger.len().expect("len"), 2, "ledger keeps growing locally");
        let calls = client.server.calls.borrow().clone();
        assert_eq!(
            calls,
            vec!["check_in", "check_in"],
            "unchecked device keeps attempting check-in, never the sensor post"
        );
    }

    #[test]
    fn successful_check_in_marks_device_checked_in() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let mut client = client(MockServer::default());
        let mut session = session();
        session.state.is_checked_in = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([false]))
            .expect("cycle");
        assert!(session.state.is_checked_in);
    }

    #[test]
    fn failed_check_in_skips_the_status_poll_for_that_cycle() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server.check_in.borrow_mut().push_back(Err(net_down()));
        let mut client = client(server);
        let mut session = session();
        session.state.is_recording = false;
        session.state.is_checked_in = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        let calls = client.server.calls.borrow().clone();
        assert_eq!(calls, vec!["check_in"], "no status poll against a down server");

        // Next cycle the server answers; the status poll resumes.
        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::default())
            .expect("cycle");
        let calls = client.server.calls.borrow().clone();
        assert_eq!(calls, vec!["check_in", "check_in", "status"]);
    }

    #[test]
    fn check_in_failure_flips_flags_but_leaves_checked_in_unchanged() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server.check_in.borrow_mut().push_back(Err(net_down()));
        let mut client = client(server);
        let mut session = session();
        session.state.is_checked_in = false;

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([false]))
            .expect("cycle");
        assert!(!session.state.is_checked_in);
        assert!(!session.state.has_internet);
        assert!(!session.state.had_internet_before);
    }

    #[test]
    fn backoff_window_skips_server_contact_but_not_sampling() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        server.sample.borrow_mut().push_back(Err(net_down()));
        // Long base: one failure blocks contact for the rest of the test.
        let mut client = SyncClient::new(server, Backoff::new(Duration::from_secs(3600), Duration::from_secs(3600)));
        let mut session = session();

        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("failing cycle");
        client
            .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
            .expect("backed-off cycle");

        let calls = client.server.calls.borrow().clone();
        assert_eq!(calls, vec!["sample"], "second cycle skipped server contact");
        assert_eq!(ledger.len().expect("len"), 2, "sampling unaffected by backoff");
    }

    #[test]
    fn current_set_never_decreases_across_mixed_cycles() {
        let root = TempDir::new().expect("root");
        let ledger = ledger(&root);
        let server = MockServer::default();
        {
            let mut sample = server.sample.borrow_mut();
            sample.push_back(Ok(parse_directives("New Set")));
            sample.push_back(Err(net_down()));
            sample.push_back(Ok(parse_directives("Stop Recording")));
        }
        server
            .status
            .borrow_mut()
            .push_back(Ok(parse_directives("New Set")));
        let mut client = client(server);
        let mut session = session();

        let mut last_set = session.state.current_set;
        for _ in 0..5 {
            client
                .run_cycle(&mut session, &ledger, &mut ScriptedMotion::new([true]))
                .expect("cycle");
            assert!(session.state.current_set >= last_set);
            last_set = session.state.current_set;
        }
        assert_eq!(last_set, 3, "two rotations across the run");
    }
}
