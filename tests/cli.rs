#[cfg(test)]
mod cli_tests {
    use std::fs;
    use std::process::{Command, Output};

    fn rox(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_rox"))
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to launch rox")
    }

    fn script(name: &str, source: &str) -> String {
        let path = std::env::temp_dir().join(format!("rox_cli_{}_{}.lox", name, std::process::id()));
        fs::write(&path, source).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_missing_file_is_a_usage_error() {
        let output = rox(&["run"]);

        assert_eq!(output.status.code(), Some(64));
        assert!(String::from_utf8_lossy(&output.stderr).contains("No input filepath"));
    }

    #[test]
    fn test_unknown_arguments_are_usage_errors() {
        assert_eq!(rox(&["bogus"]).status.code(), Some(64));
        assert_eq!(rox(&["--no-such-flag"]).status.code(), Some(64));
    }

    #[test]
    fn test_help_is_not_a_failure() {
        assert_eq!(rox(&["--help"]).status.code(), Some(0));
    }

    #[test]
    fn test_script_exit_codes() {
        let ok = script("ok", "print 1 + 2;");
        let output = rox(&["run", &ok]);
        assert_eq!(output.status.code(), Some(0));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "3\n");

        let static_error = script("static", "print (;");
        assert_eq!(rox(&["run", &static_error]).status.code(), Some(65));

        let runtime_error = script("runtime", "print 1;\nprint -nil;");
        let output = rox(&["run", &runtime_error]);
        assert_eq!(output.status.code(), Some(70));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "1\n");

        for path in [ok, static_error, runtime_error] {
            let _ = fs::remove_file(path);
        }
    }
}
