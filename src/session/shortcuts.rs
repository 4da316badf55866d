use crate::domain::{PointerButton, SurfaceEvent};

/// One line of the interactive console
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Event(SurfaceEvent),
    Quit,
}

pub fn handle_console_line(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let command = words.next()?.to_ascii_lowercase();

    match command.as_str() {
        // click <x> <y> [button]
        "click" | "c" => {
            let x = words.next()?.parse().ok()?;
            let y = words.next()?.parse().ok()?;
            let button = match words.next().map(str::to_ascii_lowercase).as_deref() {
                None | Some("primary") | Some("left") => PointerButton::Primary,
                Some("secondary") | Some("right") => PointerButton::Secondary,
                Some("middle") => PointerButton::Middle,
                Some(_) => return None,
            };
            Some(ConsoleCommand::Event(SurfaceEvent::Pointer { button, x, y }))
        }
        "esc" | "escape" | "cancel" => Some(ConsoleCommand::Event(SurfaceEvent::Cancel)),
        "capture" | "snap" => Some(ConsoleCommand::Event(SurfaceEvent::Trigger)),
        "quit" | "exit" | "q" => Some(ConsoleCommand::Quit),
        _ => None,
    }
}
