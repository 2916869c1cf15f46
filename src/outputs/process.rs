use super::{ActiveOutput, OutputError};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Substitutes `{name}` placeholders in every argument of a command template.
pub fn render_command(template: &[String], vars: &[(&str, String)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        })
        .collect()
}

/// A child process that lives exactly as long as the output it renders.
/// Stopping (or dropping the handle) kills the child.
pub struct ProcessOutput {
    stop_tx: Option<oneshot::Sender<()>>,
    active: Arc<AtomicBool>,
}

impl ProcessOutput {
    /// Must be called from inside a tokio runtime.
    pub fn spawn(argv: &[String]) -> Result<Self, OutputError> {
        let (program, args) = argv.split_first().ok_or(OutputError::EmptyCommand)?;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OutputError::Spawn { program: program.clone(), source })?;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let program = program.clone();

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    debug!(program = %program, ?status, "output process exited");
                }
                // Fires on an explicit stop and when the handle is dropped.
                _ = &mut stop_rx => {
                    let _ = child.kill().await;
                    debug!(program = %program, "output process stopped");
                }
            }
            flag.store(false, Ordering::SeqCst);
        });

        Ok(Self { stop_tx: Some(stop_tx), active })
    }
}

impl ActiveOutput for ProcessOutput {
    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
