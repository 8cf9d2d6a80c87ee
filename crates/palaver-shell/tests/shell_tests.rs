#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use palaver_core::{
        Bot, Channel, CommandRequest, PalaverError, Result, State, Update,
    };
    use palaver_shell::{Command, Shell};

    struct Echo;
    impl Command for Echo {
        fn keyword(&self) -> &str {
            "echo"
        }
        fn information_message(&self) -> &str {
            "Echo input back"
        }
        fn execute(&self, bot: &Bot, arguments: &str) -> Result<()> {
            bot.say(arguments);
            Ok(())
        }
    }

    struct Batch {
        runs: AtomicUsize,
    }
    impl Command for Batch {
        fn keyword(&self) -> &str {
            "batch"
        }
        fn information_message(&self) -> &str {
            "A slow command, queued to the worker"
        }
        fn is_interactive(&self) -> bool {
            false
        }
        fn execute(&self, _bot: &Bot, _arguments: &str) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CatchAll;
    impl Command for CatchAll {
        fn keyword(&self) -> &str {
            "*"
        }
        fn information_message(&self) -> &str {
            "Fallback for unknown verbs"
        }
        fn execute(&self, bot: &Bot, arguments: &str) -> Result<()> {
            bot.say(format!("fallback: {arguments}"));
            Ok(())
        }
    }

    struct Faulty;
    impl Command for Faulty {
        fn keyword(&self) -> &str {
            "faulty"
        }
        fn information_message(&self) -> &str {
            "Always fails"
        }
        fn execute(&self, _bot: &Bot, _arguments: &str) -> Result<()> {
            Err(PalaverError::Command {
                verb: "faulty".to_string(),
                reason: "synthetic failure".to_string(),
            })
        }
    }

    fn build_shell() -> (Shell, Arc<Channel<Update>>, Arc<Channel<CommandRequest>>) {
        let state = State::new();
        let mouth = Arc::new(Channel::new());
        let inbox = Arc::new(Channel::new());
        let bot = Bot::new(state.clone(), mouth.clone());
        (Shell::new(state, bot, inbox.clone()), mouth, inbox)
    }

    #[test]
    fn test_parse_splits_verb_and_arguments() {
        assert_eq!(Shell::parse("echo hi there"), ("echo".into(), "hi there".into()));
        assert_eq!(Shell::parse("version"), ("version".into(), String::new()));
        assert_eq!(Shell::parse("   "), (String::new(), String::new()));
    }

    #[test]
    fn test_duplicate_keyword_is_fatal() {
        let (shell, _, _) = build_shell();
        shell.load_command(Arc::new(Echo)).unwrap();
        assert!(matches!(
            shell.load_command(Arc::new(Echo)),
            Err(PalaverError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn test_command_inventory_is_sorted() {
        let (shell, _, _) = build_shell();
        shell
            .load_commands(vec![
                Arc::new(Echo),
                Arc::new(Batch { runs: AtomicUsize::new(0) }),
                Arc::new(CatchAll),
            ])
            .unwrap();
        assert_eq!(shell.commands(), vec!["*", "batch", "echo"]);
    }

    #[tokio::test]
    async fn test_interactive_command_runs_inline() {
        let (shell, mouth, inbox) = build_shell();
        shell.load_command(Arc::new(Echo)).unwrap();

        shell.do_line("echo hi", None).unwrap();
        assert_eq!(mouth.get().await, Some(Update::Text("hi".to_string())));
        assert_eq!(inbox.pending(), 0);
    }

    #[tokio::test]
    async fn test_non_interactive_command_is_queued() {
        let (shell, _, inbox) = build_shell();
        shell
            .load_command(Arc::new(Batch { runs: AtomicUsize::new(0) }))
            .unwrap();

        shell.do_line("batch crunch these numbers", None).unwrap();
        let request = inbox.get().await.unwrap();
        assert_eq!(request.verb, "batch");
        assert_eq!(request.arguments, "crunch these numbers");
    }

    #[tokio::test]
    async fn test_unknown_verb_answers_an_apology() {
        let (shell, mouth, _) = build_shell();
        shell.do_line("juggle balls", None).unwrap();
        assert_eq!(
            mouth.get().await,
            Some(Update::Text(
                "Sorry, I do not know how to handle 'juggle'".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_fallback_receives_the_full_line() {
        let (shell, mouth, _) = build_shell();
        shell.load_command(Arc::new(CatchAll)).unwrap();
        shell.do_line("juggle balls", None).unwrap();
        assert_eq!(
            mouth.get().await,
            Some(Update::Text("fallback: juggle balls".to_string()))
        );
    }

    #[tokio::test]
    async fn test_handler_fault_apologizes_then_propagates() {
        let (shell, mouth, _) = build_shell();
        shell.load_command(Arc::new(Faulty)).unwrap();

        let outcome = shell.do_line("faulty", None);
        assert!(outcome.is_err());
        assert_eq!(
            mouth.get().await,
            Some(Update::Text(
                "Sorry, I do not know how to handle 'faulty'".to_string()
            ))
        );
    }

    #[test]
    fn test_shell_keeps_line_bookkeeping() {
        let state = State::new();
        let mouth = Arc::new(Channel::new());
        let inbox = Arc::new(Channel::new());
        let bot = Bot::new(state.clone(), mouth);
        let shell = Shell::new(state.clone(), bot, inbox);

        shell.load_command(Arc::new(Echo)).unwrap();
        shell.do_line("echo one", None).unwrap();
        shell.do_line("echo two", None).unwrap();

        assert_eq!(state.get("shell.counter", serde_json::json!(0)), 2);
        assert_eq!(state.get_str("shell.line", ""), "echo two");
        assert_eq!(state.get_str("shell.verb", ""), "echo");
    }
}
