//! `chat`: interactive loop keeping conversation history.

use anyhow::Result;
use toolrelay_agent::TurnError;
use toolrelay_core::ChatMessage;

use super::cancel_on_ctrl_c;
use crate::bootstrap::CliContext;
use crate::presentation::TerminalSink;

enum Input {
    Message(String),
    Reset,
    Exit,
    Empty,
}

fn classify(line: &str) -> Input {
    match line.trim() {
        "" => Input::Empty,
        "/exit" | "/quit" => Input::Exit,
        "/reset" => Input::Reset,
        text => Input::Message(text.to_string()),
    }
}

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let controller = ctx.controller()?;
    ctx.start_auto_servers().await;
    eprintln!(
        "Chatting with {} (/reset clears history, /exit quits, Ctrl-C stops a reply)",
        ctx.settings.effective_model()
    );

    let mut history: Vec<ChatMessage> = Vec::new();
    let result = loop {
        let line = match ctx.input.prompt("\n> ").await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e.into()),
        };

        let message = match classify(&line) {
            Input::Exit => break Ok(()),
            Input::Empty => continue,
            Input::Reset => {
                history.clear();
                eprintln!("history cleared");
                continue;
            }
            Input::Message(message) => message,
        };

        let (cancel, ctrl_c) = cancel_on_ctrl_c();
        let mut sink = TerminalSink::new();
        let outcome = controller
            .stream_with_tools(&message, &history, &mut sink, &cancel)
            .await;
        ctrl_c.abort();
        println!();

        match outcome {
            Ok(outcome) => history.extend(outcome.messages),
            Err(TurnError::Cancelled) => eprintln!("cancelled"),
            Err(TurnError::Provider(e)) => eprintln!("error: {e}"),
        }
    };

    ctx.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_input() {
        assert!(matches!(classify("  "), Input::Empty));
        assert!(matches!(classify("/exit"), Input::Exit));
        assert!(matches!(classify("/quit\n"), Input::Exit));
        assert!(matches!(classify("/reset"), Input::Reset));
        assert!(matches!(classify(" hi "), Input::Message(m) if m == "hi"));
    }
}
