//! Synthesis process supervisor
//!
//! Owns the lifecycle of at most one external synthesis process: start,
//! monitor, pre-empt, stop, and guaranteed cleanup on every exit path.
//! All process failures stay inside this module and surface only as log
//! entries; callers see "is synthesis active" and whether their request
//! was accepted.
//!
//! The single process handle lives in a mutex-guarded slot. Every exit
//! trigger (natural exit, explicit stop, pre-emption, teardown) funnels
//! into one disposal routine that takes the handle out of the slot, so
//! whichever trigger gets there first wins and the loser observes an
//! empty slot and does nothing.

use crate::command::{self, LIST_VOICES_COMMAND};
use crate::voice::{parse_voice_list, VoiceInfo, VoiceSelector};
use crate::{platform, Result, WinttsError};
use log::{debug, error, info, warn};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Arguments used when the interpreter is PowerShell
pub const POWERSHELL_ARGS: &[&str] = &["-NoProfile", "-NonInteractive", "-Command"];

/// How often the exit monitor polls a live process
const MONITOR_POLL: Duration = Duration::from_millis(50);

/// One synthesis request: which voice, what text
///
/// Transient; consumed by [`Supervisor::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub voice: VoiceSelector,
    pub text: String,
}

impl SynthesisRequest {
    pub fn new(voice: VoiceSelector, text: impl Into<String>) -> Self {
        Self {
            voice,
            text: text.into(),
        }
    }
}

/// Completion signal delivered when active synthesis ends
///
/// `stopped` is true when the process was torn down by an explicit stop,
/// a pre-emption, or teardown; false when it exited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisEvent {
    Finished { stopped: bool },
}

/// The single nullable process slot
///
/// `generation` increments on every spawn so a stale exit monitor can
/// tell it has been superseded and bow out without touching anything.
struct ProcessSlot {
    child: Option<Child>,
    generation: u64,
}

/// Lock the slot, recovering from a poisoned mutex
///
/// None of the critical sections can leave the slot in an inconsistent
/// state, so a panic elsewhere is no reason to stop cleaning up.
fn lock_slot(slot: &Mutex<ProcessSlot>) -> MutexGuard<'_, ProcessSlot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Supervisor for the external synthesis process
///
/// At most one synthesis process is alive at any time. `submit` pre-empts
/// whatever is still speaking; `stop` is a no-op when idle. Dropping the
/// supervisor kills any live process so nothing outlives its owner.
pub struct Supervisor {
    slot: Arc<Mutex<ProcessSlot>>,
    active: Arc<AtomicBool>,
    events: Sender<SynthesisEvent>,

    /// Interpreter program (normally powershell.exe)
    program: String,
    /// Arguments placed before the command string
    base_args: Vec<String>,

    /// Current voice selection, used as the default for new requests
    voice: VoiceSelector,
    /// Volume (0-100) applied to each utterance
    volume: u8,
    /// Rate (-10 to 10) applied to each utterance
    rate: i8,
}

impl Supervisor {
    /// Create a supervisor backed by the discovered PowerShell interpreter
    ///
    /// Returns the supervisor and the receiving end of its completion
    /// event channel.
    pub fn new() -> Result<(Self, Receiver<SynthesisEvent>)> {
        let program = platform::find_powershell()?;
        Ok(Self::with_command(program, POWERSHELL_ARGS.iter().copied()))
    }

    /// Create a supervisor with an explicit interpreter invocation
    ///
    /// Used when the config overrides the PowerShell path, and by tests
    /// that substitute a plain shell.
    pub fn with_command<I, S>(program: impl Into<String>, base_args: I) -> (Self, Receiver<SynthesisEvent>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, rx) = mpsc::channel();
        let supervisor = Self {
            slot: Arc::new(Mutex::new(ProcessSlot {
                child: None,
                generation: 0,
            })),
            active: Arc::new(AtomicBool::new(false)),
            events: tx,
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
            voice: VoiceSelector::default(),
            volume: 100,
            rate: 0,
        };
        (supervisor, rx)
    }

    /// Whether a synthesis process is currently active
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Current voice selection
    pub fn voice(&self) -> VoiceSelector {
        self.voice
    }

    /// Change the voice used for subsequent requests
    pub fn select_voice(&mut self, voice: VoiceSelector) {
        debug!("Voice selected: {}", voice.sapi_name());
        self.voice = voice;
    }

    /// Set utterance volume (clamped to 0-100)
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    /// Set utterance rate (clamped to -10..=10)
    pub fn set_rate(&mut self, rate: i8) {
        self.rate = rate.clamp(-10, 10);
    }

    /// Submit a synthesis request, pre-empting any active process
    ///
    /// Empty text is rejected before any process action. On success the
    /// active flag is set at spawn time; the engine gives no earlier
    /// positive signal. Spawn failures resolve back to idle.
    pub fn submit(&mut self, request: SynthesisRequest) -> Result<()> {
        if request.text.is_empty() {
            warn!("Rejecting synthesis request with empty text");
            return Err(WinttsError::Validation("input text is empty".to_string()));
        }

        self.voice = request.voice;
        let script =
            command::build_speak_command(request.voice, &request.text, self.volume, self.rate);
        self.spawn_command(&script)
    }

    /// Stop any active synthesis
    ///
    /// No-op when idle. Returns whether a process was actually stopped;
    /// termination failures are logged, never escalated.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            debug!("Stop requested while idle");
            return false;
        }
        let stopped = self.cleanup(true);
        if stopped {
            info!("Synthesis stopped");
        }
        stopped
    }

    /// Enumerate installed voices
    ///
    /// One-shot synchronous call: spawns the enumeration subprocess,
    /// drains its stdout, waits for exit, and parses one
    /// `"<name> | Gender: <gender>"` entry per line. Independent of the
    /// synthesis lifecycle; failures are non-fatal to the rest of the
    /// system.
    pub fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        debug!("Enumerating installed voices");

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .arg(LIST_VOICES_COMMAND)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                WinttsError::Enumeration(format!("Failed to run voice enumeration: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WinttsError::Enumeration(format!(
                "Voice enumeration failed: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let voices = parse_voice_list(&stdout);
        info!("Found {} installed voices", voices.len());
        Ok(voices)
    }

    /// Pre-empt any active process and spawn a new one for `script`
    fn spawn_command(&mut self, script: &str) -> Result<()> {
        // Pre-empt whatever is still speaking
        self.cleanup(true);

        debug!("Spawning synthesis process");
        let spawned = Command::new(&self.program)
            .args(&self.base_args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        match spawned {
            Ok(child) => {
                let generation = {
                    let mut slot = lock_slot(&self.slot);
                    slot.generation += 1;
                    debug!("Synthesis process started with PID {}", child.id());
                    slot.child = Some(child);
                    slot.generation
                };
                self.active.store(true, Ordering::SeqCst);
                self.spawn_monitor(generation);
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn synthesis process: {}", e);
                self.cleanup(true);
                Err(WinttsError::Spawn(format!(
                    "Failed to start synthesis: {}",
                    e
                )))
            }
        }
    }

    /// Watch a spawned process for natural exit
    ///
    /// The monitor's only job is to clear the active flag and fire the
    /// completion event when the process ends on its own. It exits
    /// silently when its generation is stale or the slot is already
    /// empty, so it never races a concurrent stop or pre-emption.
    fn spawn_monitor(&self, generation: u64) {
        let slot = Arc::clone(&self.slot);
        let active = Arc::clone(&self.active);
        let events = self.events.clone();

        thread::spawn(move || loop {
            {
                let mut guard = lock_slot(&slot);
                if guard.generation != generation {
                    // Superseded by a newer spawn
                    return;
                }
                let Some(child) = guard.child.as_mut() else {
                    // Stopped or pre-empted elsewhere
                    return;
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!("Synthesis process exited: {}", status);
                        guard.child = None;
                        active.store(false, Ordering::SeqCst);
                        let _ = events.send(SynthesisEvent::Finished { stopped: false });
                        return;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Failed to query synthesis process state: {}", e);
                        guard.child = None;
                        active.store(false, Ordering::SeqCst);
                        let _ = events.send(SynthesisEvent::Finished { stopped: false });
                        return;
                    }
                }
            }
            thread::sleep(MONITOR_POLL);
        });
    }

    /// Single disposal routine for every exit trigger
    ///
    /// Takes the handle out of the slot (a second caller finds it empty
    /// and does nothing), kills the process if it has not already
    /// exited, reaps it, and clears the active flag. Each step runs even
    /// if an earlier one failed. Returns whether a process was torn
    /// down; exactly one completion event is sent per torn-down process.
    fn cleanup(&self, stopped_by_caller: bool) -> bool {
        let child = {
            let mut slot = lock_slot(&self.slot);
            slot.child.take()
        };

        let Some(mut child) = child else {
            self.active.store(false, Ordering::SeqCst);
            return false;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Synthesis process had already exited: {}", status);
            }
            Ok(None) => {
                debug!("Killing synthesis process {}", child.id());
                if let Err(e) = child.kill() {
                    // Process likely exited between the check and the kill
                    warn!("Failed to kill synthesis process: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to query synthesis process state: {}", e);
                if let Err(e) = child.kill() {
                    warn!("Failed to kill synthesis process: {}", e);
                }
            }
        }

        // Reap so the OS releases the process resources
        if let Err(e) = child.wait() {
            warn!("Failed to reap synthesis process: {}", e);
        }

        self.active.store(false, Ordering::SeqCst);
        let _ = self.events.send(SynthesisEvent::Finished {
            stopped: stopped_by_caller,
        });
        true
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        debug!("Shutting down synthesis supervisor");
        self.cleanup(true);
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::sync::mpsc::TryRecvError;

    /// Supervisor driven by a plain shell instead of PowerShell, so the
    /// lifecycle can be exercised deterministically on any Unix box
    fn shell_supervisor() -> (Supervisor, Receiver<SynthesisEvent>) {
        Supervisor::with_command("sh", ["-c"])
    }

    fn wait_until_idle(supervisor: &Supervisor) {
        for _ in 0..100 {
            if !supervisor.is_active() {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
        panic!("supervisor did not return to idle");
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut supervisor, events) = shell_supervisor();

        assert!(!supervisor.is_active());
        assert!(!supervisor.stop());
        assert!(!supervisor.is_active());
        // No process, no event
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_empty_text_rejected_before_any_process_action() {
        let (mut supervisor, events) = shell_supervisor();

        let result = supervisor.submit(SynthesisRequest::new(VoiceSelector::EnglishMale, ""));
        assert!(matches!(result, Err(WinttsError::Validation(_))));
        assert!(!supervisor.is_active());
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_spawn_failure_resolves_to_idle() {
        let (mut supervisor, _events) =
            Supervisor::with_command("/nonexistent/interpreter", ["-c"]);

        let result = supervisor.spawn_command("true");
        assert!(matches!(result, Err(WinttsError::Spawn(_))));
        assert!(!supervisor.is_active());
    }

    #[test]
    fn test_natural_exit_clears_active_flag() {
        let (mut supervisor, events) = shell_supervisor();

        supervisor.spawn_command("true").expect("spawn failed");
        assert!(supervisor.is_active());

        wait_until_idle(&supervisor);
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(SynthesisEvent::Finished { stopped: false })
        );
        // Stop after natural exit stays a no-op
        assert!(!supervisor.stop());
    }

    #[test]
    fn test_stop_kills_active_process() {
        let (mut supervisor, events) = shell_supervisor();

        supervisor.spawn_command("sleep 5").expect("spawn failed");
        assert!(supervisor.is_active());

        assert!(supervisor.stop());
        assert!(!supervisor.is_active());
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(SynthesisEvent::Finished { stopped: true })
        );
        // Exactly one event per torn-down process
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_preemption_leaves_exactly_one_active_process() {
        let (mut supervisor, events) = shell_supervisor();

        supervisor.spawn_command("sleep 5").expect("first spawn failed");
        assert!(supervisor.is_active());

        // Second spawn pre-empts the first: one termination, one spawn
        supervisor.spawn_command("sleep 5").expect("second spawn failed");
        assert!(supervisor.is_active());

        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(SynthesisEvent::Finished { stopped: true })
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        assert!(supervisor.stop());
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(SynthesisEvent::Finished { stopped: true })
        );
    }

    #[test]
    fn test_submit_spawns_and_returns_to_idle() {
        let (mut supervisor, events) = shell_supervisor();

        // The generated script is not valid shell, so the process exits
        // quickly on its own; the lifecycle is what matters here
        let request = SynthesisRequest::new(VoiceSelector::ChineseFemale, "hello");
        supervisor.submit(request).expect("submit failed");
        assert!(supervisor.is_active());

        wait_until_idle(&supervisor);
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(SynthesisEvent::Finished { stopped: false })
        );
    }

    #[test]
    fn test_submit_updates_voice() {
        let (mut supervisor, _events) = shell_supervisor();

        assert_eq!(supervisor.voice(), VoiceSelector::default());
        supervisor
            .submit(SynthesisRequest::new(VoiceSelector::EnglishMale, "hi"))
            .expect("submit failed");
        assert_eq!(supervisor.voice(), VoiceSelector::EnglishMale);
        supervisor.stop();
    }

    #[test]
    fn test_teardown_stops_process() {
        let (mut supervisor, events) = shell_supervisor();

        supervisor.spawn_command("sleep 5").expect("spawn failed");
        drop(supervisor);

        assert_eq!(
            events.try_recv(),
            Ok(SynthesisEvent::Finished { stopped: true })
        );
    }

    #[test]
    fn test_settings_are_clamped() {
        let (mut supervisor, _events) = shell_supervisor();

        supervisor.set_volume(250);
        supervisor.set_rate(-100);
        // Only observable through the built command; just make sure the
        // setters themselves stay in range
        assert!(supervisor.volume <= 100);
        assert_eq!(supervisor.rate, -10);
    }

    #[test]
    fn test_list_voices_reports_enumeration_failure() {
        // A plain shell cannot run the enumeration script; the failure
        // must come back as an enumeration error, not a panic or a hang
        let (supervisor, _events) = shell_supervisor();
        let result = supervisor.list_voices();
        assert!(matches!(result, Err(WinttsError::Enumeration(_))));
    }

    #[test]
    fn test_list_voices_missing_interpreter() {
        let (supervisor, _events) =
            Supervisor::with_command("/nonexistent/interpreter", ["-c"]);
        let result = supervisor.list_voices();
        assert!(matches!(result, Err(WinttsError::Enumeration(_))));
    }
}
