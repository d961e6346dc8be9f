use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use workchat_core::{update, AppState, Msg};
use workchat_logging::{wc_debug, wc_info, wc_warn};

use crate::commands::{self, Command, HELP};
use crate::config::ClientConfig;
use crate::effects::{EffectRunner, Inbound};
use crate::render::{self, Renderer};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run(config: &ClientConfig) -> anyhow::Result<()> {
    let runner = EffectRunner::new(config.api_settings())?;
    let lines = spawn_stdin_reader();
    let mut app = App::new(runner, io::stdout());

    writeln!(app.out, "WorkChat @ {} (/help for commands)", config.base_url)?;
    app.runner.probe_status();

    let mut input_open = true;
    loop {
        if input_open {
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if app.handle_line(&line)? == Flow::Quit {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    wc_info!("Input closed, waiting for outstanding requests");
                    input_open = false;
                }
            }
        }

        let wait = if input_open { Duration::ZERO } else { POLL_INTERVAL };
        for inbound in app.runner.poll(wait) {
            app.handle_inbound(inbound)?;
        }
        app.render()?;

        // Piped input: answer everything that was asked before exiting.
        if !input_open && app.state.is_settled() {
            break;
        }
    }

    app.runner.shutdown();
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (line_tx, line_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    wc_warn!("Failed to read input: {}", err);
                    break;
                }
            }
        }
    });
    line_rx
}

struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    out: W,
}

impl<W: Write> App<W> {
    fn new(runner: EffectRunner, out: W) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::default(),
            out,
        }
    }

    fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let command = match commands::parse(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(self.out, "! {err}")?;
                return Ok(Flow::Continue);
            }
        };
        wc_debug!("Command {:?}", command);

        match &command {
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::ListCategories => {
                let selected = self.state.chat().category().map(|category| category.label);
                render::write_categories(selected, &mut self.out)?;
            }
            Command::Status => self.runner.probe_status(),
            Command::Files => self.renderer.show_files(),
            Command::Quit => return Ok(Flow::Quit),
            _ => {}
        }

        for msg in command.into_msgs() {
            self.dispatch_msg(msg);
        }
        Ok(Flow::Continue)
    }

    fn handle_inbound(&mut self, inbound: Inbound) -> io::Result<()> {
        match inbound {
            Inbound::Update(msg) => self.dispatch_msg(msg),
            Inbound::Status(Ok(status)) => writeln!(self.out, "* server status {status}")?,
            Inbound::Status(Err(err)) => writeln!(self.out, "! server unreachable ({err})")?,
        }
        Ok(())
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    fn render(&mut self) -> io::Result<()> {
        if self.state.consume_dirty() || self.renderer.has_pending_output() {
            let view = self.state.view();
            self.renderer.render(&view, &mut self.out)?;
        }
        let notices = self.state.take_notices();
        render::write_notices(&notices, &mut self.out)?;
        self.out.flush()
    }
}
