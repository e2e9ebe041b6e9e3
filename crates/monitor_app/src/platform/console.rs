/// Lines understood on stdin while the monitor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Check,
    Reload,
    Start,
    Stop,
    Show,
    Hide,
    Status,
    Quit,
}

impl ConsoleCommand {
    pub const HELP: &'static str = "check, reload, start, stop, show, hide, status, quit";

    pub fn parse(line: &str) -> Option<Self> {
        let command = match line.trim().to_ascii_lowercase().as_str() {
            "check" => Self::Check,
            "reload" => Self::Reload,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "show" | "visible" => Self::Show,
            "hide" | "hidden" => Self::Hide,
            "status" => Self::Status,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }
}
