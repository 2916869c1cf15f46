use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Operator commands, one per stdin line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Quit,
    ResetTimer,
    ManualTrigger,
    ToggleSound,
    VolumeUp,
    VolumeDown,
}

pub const VOLUME_STEP: f32 = 0.1;

impl ControlCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "q" | "quit" | "esc" | "exit" => Some(Self::Quit),
            "r" | "reset" => Some(Self::ResetTimer),
            "m" | "meme" => Some(Self::ManualTrigger),
            "s" | "sound" => Some(Self::ToggleSound),
            "+" | "=" => Some(Self::VolumeUp),
            "-" | "_" => Some(Self::VolumeDown),
            _ => None,
        }
    }
}

pub const HELP: &str = "Controls (type + Enter):\n  \
    q  Quit\n  \
    r  Reset emotion timer\n  \
    m  Manually trigger meme\n  \
    s  Toggle sound\n  \
    +/- Volume up/down";

/// Reads stdin lines into commands until EOF or the receiver goes away.
pub fn spawn_stdin_reader(tx: mpsc::Sender<ControlCommand>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let Some(command) = ControlCommand::parse(&line) else {
                        warn!("unknown command {:?}", line.trim());
                        continue;
                    };
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("stdin closed, console controls disabled");
                    break;
                }
                Err(e) => {
                    error!("failed to read stdin: {}", e);
                    break;
                }
            }
        }
    })
}

/// Ctrl-C is just another way to say `q`.
pub fn spawn_ctrl_c(tx: mpsc::Sender<ControlCommand>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted by user");
            let _ = tx.send(ControlCommand::Quit).await;
        }
    })
}
