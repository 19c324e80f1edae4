//! Terminal rendition of the five screens.
//!
//! Input is line based. Commands start with `/`; on the scan screen anything
//! else is taken as decoded QR text, so a payload can be pasted from any
//! decoder. On the PIN screens anything else edits the form.

use crate::config::Config;
use crate::constants::{intervals::COUNTDOWN_TICK, messages};
use crate::scan::{self, ScanSource};
use crate::services::ExpirySweeper;
use crate::session::{Completion, Screen, Session, SessionSettings, format_countdown, is_urgent, is_url};
use crate::store::RecordStore;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

enum Flow {
    Continue,
    Quit,
}

pub async fn run(config: &Config, store: RecordStore, payload: Option<String>) -> anyhow::Result<()> {
    if config.general.sweep_on_start {
        ExpirySweeper::new(store.clone()).spawn();
    }

    let scanner = scan::from_config(config.scan.command.as_deref());
    let mut session = Session::new(store, SessionSettings::from(&config.session));

    if let Some(payload) = payload {
        session.scan(payload)?;
    }

    let interrupts = listen_for_interrupts();
    drive(
        &mut session,
        scanner,
        BufReader::new(tokio::io::stdin()),
        interrupts,
    )
    .await?;

    println!("Bye.");
    Ok(())
}

/// Forwards every Ctrl-C from a single signal listener. The channel closes
/// if the handler cannot be installed.
fn listen_for_interrupts() -> UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });

    rx
}

/// Runs the screens until `/quit`, end of input, or an interrupt while no
/// request is in flight. An interrupt during a save or lookup only cancels
/// that request.
async fn drive<R>(
    session: &mut Session,
    mut scanner: Option<Box<dyn ScanSource>>,
    input: R,
    mut interrupts: UnboundedReceiver<()>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut countdown = tokio::time::interval(COUNTDOWN_TICK);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);

    render(session);

    loop {
        let viewing = matches!(session.screen(), Screen::ViewingRetrieved { .. });

        tokio::select! {
            biased;

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                let flow = handle(session, scanner.as_deref_mut(), &mut interrupts, line.trim()).await;
                if matches!(flow, Flow::Quit) {
                    break;
                }

                if !viewing && matches!(session.screen(), Screen::ViewingRetrieved { .. }) {
                    countdown.reset();
                }

                render(session);
            }

            Some(()) = interrupts.recv() => {
                println!();
                debug!(screen = session.screen().name(), "Interrupted");
                break;
            }

            _ = countdown.tick(), if viewing => {
                match session.tick().await {
                    Some(notice) => {
                        println!();
                        println!("{notice}");
                        render(session);
                    }
                    None => render_countdown(session),
                }
            }
        }
    }

    Ok(())
}

async fn handle(
    session: &mut Session,
    scanner: Option<&mut (dyn ScanSource + 'static)>,
    interrupts: &mut UnboundedReceiver<()>,
    line: &str,
) -> Flow {
    if matches!(line, "/quit" | "/q") {
        return Flow::Quit;
    }

    let result = match session.screen() {
        Screen::Scanning => match line {
            "" => Ok(()),
            "/access" | "/a" => session.access(),
            "/scan" | "/s" => {
                scan_with_camera(session, scanner).await;
                Ok(())
            }
            text => session.scan(text.to_string()),
        },

        Screen::ViewingScanned { .. } => match line {
            "o" | "open" | "/open" => {
                print_link(session.screen());
                Ok(())
            }
            "p" | "protect" | "/protect" => session.enable_sync(),
            "c" | "cancel" | "/cancel" => session.cancel(),
            _ => Ok(()),
        },

        Screen::CreatingPin { .. } => match line {
            "/save" => {
                let request = match session.begin_save() {
                    Ok(request) => request,
                    Err(e) => {
                        debug!(error = %e, "Save rejected");
                        return Flow::Continue;
                    }
                };
                let call = request.clone();
                let store = session.store().clone();
                let result =
                    cancellable(session, interrupts, async move { call.execute(&store).await })
                        .await;
                match session.finish_save(request, result) {
                    Completion::Applied(Some(notice)) => println!("{notice}"),
                    Completion::Applied(None) => {}
                    Completion::Stale => println!("Save cancelled."),
                }
                Ok(())
            }
            "/cancel" => session.cancel(),
            other => {
                edit_form(session, other);
                Ok(())
            }
        },

        Screen::EnteringPin { .. } => match line {
            "/go" => {
                let request = match session.begin_verify() {
                    Ok(request) => request,
                    Err(e) => {
                        debug!(error = %e, "Access rejected");
                        return Flow::Continue;
                    }
                };
                let call = request.clone();
                let store = session.store().clone();
                let outcome =
                    cancellable(session, interrupts, async move { call.execute(&store).await })
                        .await;
                if session.finish_verify(request, outcome).is_stale() {
                    println!("Access cancelled.");
                }
                Ok(())
            }
            "/cancel" => session.cancel(),
            other => {
                edit_form(session, other);
                Ok(())
            }
        },

        Screen::ViewingRetrieved { .. } => match line {
            "o" | "open" | "/open" => {
                print_link(session.screen());
                Ok(())
            }
            "d" | "delete" | "/delete" => {
                session.delete_now().await.map(|notice| println!("{notice}"))
            }
            _ => Ok(()),
        },
    };

    if let Err(e) = result {
        debug!(error = %e, "Input ignored");
    }

    Flow::Continue
}

/// Awaits `call`; an interrupt backs out of the current screen first, so the
/// result arrives stale and is dropped.
async fn cancellable<F: Future>(
    session: &mut Session,
    interrupts: &mut UnboundedReceiver<()>,
    call: F,
) -> F::Output {
    tokio::pin!(call);

    let early = tokio::select! {
        biased;
        output = &mut call => Some(output),
        Some(()) = interrupts.recv() => None,
    };

    match early {
        Some(output) => output,
        None => {
            if let Err(e) = session.cancel() {
                debug!(error = %e, "Nothing to cancel");
            }
            call.await
        }
    }
}

async fn scan_with_camera(session: &mut Session, scanner: Option<&mut (dyn ScanSource + 'static)>) {
    let Some(scanner) = scanner else {
        println!("No scanner configured (scan.command). Paste the decoded text instead.");
        return;
    };

    println!("Scanning...");
    match scanner.next_payload().await {
        Ok(payload) => {
            if let Err(e) = session.scan(payload) {
                debug!(error = %e, "Scan ignored");
            }
        }
        Err(e) => {
            warn!(error = %e, "Error starting scanner");
            println!("{}", messages::CAMERA_FAILED);
        }
    }
}

/// Digits edit the PIN, a single letter toggles it in the picker, and a
/// longer run of letters replaces the selection.
fn edit_form(session: &mut Session, line: &str) {
    let Some(form) = session.form_mut() else {
        return;
    };

    if line.is_empty() {
        return;
    }

    if line == "/clear" {
        form.clear();
    } else if line.bytes().all(|b| b.is_ascii_digit()) {
        if !form.set_pin(line) {
            println!("PIN is 4 digits.");
        }
    } else if line.chars().count() == 1 {
        if let Some(letter) = line.chars().next() {
            form.toggle_letter(letter);
        }
    } else if line.chars().all(char::is_alphabetic) {
        form.set_letters(line);
    }
}

fn print_link(screen: &Screen) {
    match screen.content() {
        Some(content) if is_url(content) => println!("Open: {}", content.trim()),
        _ => println!("Not a link."),
    }
}

fn render(session: &Session) {
    println!();
    println!("== QR Sync ==");

    match session.screen() {
        Screen::Scanning => {
            println!("Scan a QR Code");
            println!("  Paste decoded QR text, or:");
            println!("  /scan      Decode with the configured scanner");
            println!("  /access    Access QR Sync Data");
            println!("  /quit");
        }

        Screen::ViewingScanned { content } => {
            println!("QR Content");
            println!("  {content}");
            println!();
            if is_url(content) {
                println!("  o        Open Link");
            }
            println!("  p        Enable QR Sync");
            println!("  c        Cancel");
        }

        Screen::CreatingPin { form, .. } => {
            println!("Create a PIN");
            println!("Create a 4-digit PIN and select 2 letters to secure your QR data");
            render_form(session, form.pin(), &form.selection_label());
            if form.is_complete() {
                println!("  /save    Save & Exit");
            }
            println!("  /cancel");
        }

        Screen::EnteringPin { form } => {
            println!("Access QR Sync Data");
            render_form(session, form.pin(), &form.selection_label());
            if form.is_complete() {
                println!("  /go      Access Data");
            }
            println!("  /cancel");
        }

        Screen::ViewingRetrieved {
            content, remaining, ..
        } => {
            println!("QR Data Retrieved");
            println!("Data expires in: {}", format_countdown(*remaining));
            println!("Content:");
            println!("  {content}");
            println!();
            if is_url(content) {
                println!("  o        Open Link");
            }
            println!("  d        Delete Now");
        }
    }

    let _ = std::io::stdout().flush();
}

fn render_form(session: &Session, pin: &str, selection: &str) {
    if let Some(error) = session.error() {
        println!("! {error}");
    }
    println!("  4-Digit PIN: {pin}");
    println!("  Selected: {selection}");
    println!("  (type digits for the PIN, a letter to toggle it, two letters, or /clear)");
}

fn render_countdown(session: &Session) {
    if let Screen::ViewingRetrieved { remaining, .. } = session.screen() {
        let marker = if is_urgent(*remaining) { "!" } else { " " };
        print!("\r{marker} Data expires in: {}   ", format_countdown(*remaining));
        let _ = std::io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;
    use crate::scan::QueuedScanner;
    use crate::store::MemoryBackend;
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;

    fn session_on(backend: &MemoryBackend) -> Session {
        let store = RecordStore::new(Arc::new(backend.clone()));
        Session::new(store, SessionSettings::default())
    }

    fn closed_interrupts() -> UnboundedReceiver<()> {
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }

    #[tokio::test]
    async fn test_interrupt_quits_while_viewing_retrieved_data() {
        let backend = MemoryBackend::new();
        let mut session = session_on(&backend);
        let key = derive_key("1234", "AB").unwrap();
        session.store().store("hello", &key).await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();

        let (mut writer, reader) = tokio::io::duplex(1024);
        writer.write_all(b"/access\n1234\nab\n/go\n").await.unwrap();

        drive(&mut session, None, BufReader::new(reader), rx)
            .await
            .unwrap();

        assert!(matches!(session.screen(), Screen::ViewingRetrieved { .. }));
        drop(writer);
    }

    #[tokio::test]
    async fn test_interrupt_quits_after_save_through_scanner() {
        let backend = MemoryBackend::new();
        let mut session = session_on(&backend);
        let scanner = QueuedScanner::new(["https://example.com".to_string()]);

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();

        let (mut writer, reader) = tokio::io::duplex(1024);
        writer
            .write_all(b"/scan\np\n1234\nab\n/save\n")
            .await
            .unwrap();

        drive(&mut session, Some(Box::new(scanner)), BufReader::new(reader), rx)
            .await
            .unwrap();

        assert_eq!(session.screen(), &Screen::Scanning);
        assert_eq!(backend.len().await, 1);
        drop(writer);
    }

    #[tokio::test]
    async fn test_command_words_are_plain_input() {
        let backend = MemoryBackend::new();

        let mut session = session_on(&backend);
        drive(&mut session, None, &b"quit\n"[..], closed_interrupts())
            .await
            .unwrap();
        assert_eq!(
            session.screen(),
            &Screen::ViewingScanned {
                content: "quit".to_string()
            }
        );

        let mut session = session_on(&backend);
        drive(&mut session, None, &b"/access\n1234\ngo\n"[..], closed_interrupts())
            .await
            .unwrap();
        let form = session.screen().form().unwrap();
        assert_eq!(form.letters(), &['G', 'O']);
        assert_eq!(backend.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_quit_command_ends_the_loop() {
        let backend = MemoryBackend::new();
        let mut session = session_on(&backend);

        drive(&mut session, None, &b"/quit\nhello\n"[..], closed_interrupts())
            .await
            .unwrap();
        assert_eq!(session.screen(), &Screen::Scanning);
    }
}
