use crate::cli::{self, Cli, LiteCli};
use crate::config::{self, default_config_root, resolve_path, Provider};
use crate::error::GenError;
use crate::input::{build_prompt, read_body};
use crate::llm::{GeneratorFactory, HttpGeneratorFactory};
use crate::logging;
use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "API_KEY";

pub fn version_line() -> String {
    format!("ged version {}", env!("CARGO_PKG_VERSION"))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse_from(cli::normalize_legacy_flags(env::args_os()));
    logging::init();

    let factory = HttpGeneratorFactory::new();
    let config_root = default_config_root();

    let result = {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        let stdout = io::stdout();
        let mut stdout_lock = stdout.lock();
        run_with_io(cli, &factory, &config_root, &mut stdin_lock, &mut stdout_lock)
    };

    std::process::exit(report(result));
}

/// Entry point for `ged-lite`: Gemini only, keyed by `$API_KEY`.
pub fn run_lite() -> Result<()> {
    let cli = LiteCli::parse_from(cli::normalize_legacy_flags(env::args_os()));
    logging::init();

    let factory = HttpGeneratorFactory::new();
    let api_key = env::var(API_KEY_ENV).ok();

    let result = {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        let stdout = io::stdout();
        let mut stdout_lock = stdout.lock();
        run_lite_with_io(cli, &factory, api_key, &mut stdin_lock, &mut stdout_lock)
    };

    std::process::exit(report(result));
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    }
}

pub fn run_with_io<F, R, W>(
    cli: Cli,
    factory: &F,
    config_root: &Path,
    reader: &mut R,
    out: &mut W,
) -> Result<()>
where
    F: GeneratorFactory,
    R: BufRead,
    W: Write,
{
    if cli.version {
        writeln!(out, "{}", version_line())?;
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| resolve_path(config_root));

    if cli.configure {
        return configure(&config_path, out);
    }

    let script = cli.script.as_deref().ok_or_else(|| GenError::Usage {
        usage: cli::usage(),
    })?;

    let cfg = config::load(&config_path)?;
    let body = read_body(cli.file.as_deref(), reader)?;
    let prompt = build_prompt(script, &body);

    let provider = cli.provider.unwrap_or_else(|| cfg.provider());
    ask(
        factory,
        provider,
        cfg.api_key_for(provider),
        cli.model.as_deref(),
        &prompt,
        out,
    )
}

pub fn run_lite_with_io<F, R, W>(
    cli: LiteCli,
    factory: &F,
    api_key: Option<String>,
    reader: &mut R,
    out: &mut W,
) -> Result<()>
where
    F: GeneratorFactory,
    R: BufRead,
    W: Write,
{
    if cli.version {
        writeln!(out, "{}", version_line())?;
        return Ok(());
    }

    let script = cli.script.as_deref().ok_or_else(|| GenError::Usage {
        usage: cli::lite_usage(),
    })?;

    let api_key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            GenError::client(
                Provider::Gemini.as_str(),
                format!("no API key; set the {API_KEY_ENV} environment variable"),
            )
        })?;

    let body = read_body(cli.file.as_deref(), reader)?;
    let prompt = build_prompt(script, &body);
    ask(
        factory,
        Provider::Gemini,
        &api_key,
        cli.model.as_deref(),
        &prompt,
        out,
    )
}

fn configure<W: Write>(config_path: &Path, out: &mut W) -> Result<()> {
    if config::write_template(config_path)? {
        info!(path = %config_path.display(), "config template created");
        writeln!(out, "Default configuration written to {}", config_path.display())?;
        writeln!(
            out,
            "Fill in the ApiKey for the provider you use (and optionally DefaultUseService) before running ged."
        )?;
    } else {
        debug!(path = %config_path.display(), "config already present; leaving it unchanged");
        writeln!(
            out,
            "Config file already exists at {}; leaving it unchanged.",
            config_path.display()
        )?;
    }
    Ok(())
}

fn ask<F, W>(
    factory: &F,
    provider: Provider,
    api_key: &str,
    model: Option<&str>,
    prompt: &str,
    out: &mut W,
) -> Result<()>
where
    F: GeneratorFactory,
    W: Write,
{
    info!(provider = provider.as_str(), prompt_len = prompt.len(), "asking provider");
    let generator = factory.build(provider, api_key, model)?;
    let fragments = generator.generate(prompt)?;

    for fragment in &fragments {
        writeln!(out, "{}", fragment).context("Failed to write completion to stdout")?;
    }
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TextGenerator;
    use std::cell::RefCell;
    use std::fs;
    use std::io::{Cursor, Read};
    use std::path::PathBuf;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    struct BuildCall {
        provider: Provider,
        api_key: String,
        model: Option<String>,
    }

    #[derive(Default)]
    struct StubFactory {
        fragments: Vec<String>,
        fail_with: Option<String>,
        builds: RefCell<Vec<BuildCall>>,
        prompts: Rc<RefCell<Vec<String>>>,
    }

    impl StubFactory {
        fn replying(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.borrow().clone()
        }
    }

    struct StubGenerator {
        fragments: Vec<String>,
        fail_with: Option<String>,
        prompts: Rc<RefCell<Vec<String>>>,
    }

    impl TextGenerator for StubGenerator {
        fn generate(&self, prompt: &str) -> Result<Vec<String>> {
            self.prompts.borrow_mut().push(prompt.to_string());
            match &self.fail_with {
                Some(message) => Err(GenError::request("stub", message.clone()).into()),
                None => Ok(self.fragments.clone()),
            }
        }
    }

    impl GeneratorFactory for StubFactory {
        fn build(
            &self,
            provider: Provider,
            api_key: &str,
            model: Option<&str>,
        ) -> Result<Box<dyn TextGenerator>> {
            self.builds.borrow_mut().push(BuildCall {
                provider,
                api_key: api_key.to_string(),
                model: model.map(str::to_string),
            });
            Ok(Box::new(StubGenerator {
                fragments: self.fragments.clone(),
                fail_with: self.fail_with.clone(),
                prompts: Rc::clone(&self.prompts),
            }))
        }
    }

    fn ask_cli(script: &str, file: Option<PathBuf>) -> Cli {
        Cli {
            script: Some(script.to_string()),
            file,
            ..Cli::default()
        }
    }

    fn write_config(root: &Path, content: &str) -> PathBuf {
        let path = resolve_path(root);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn run_capture(cli: Cli, factory: &StubFactory, root: &Path, stdin: &[u8]) -> (Result<()>, String) {
        let mut reader = Cursor::new(stdin.to_vec());
        let mut out = Vec::new();
        let result = run_with_io(cli, factory, root, &mut reader, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn version_prints_fixed_line_and_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("config");
        let factory = StubFactory::replying(&["unused"]);
        let cli = Cli {
            version: true,
            configure: true,
            script: Some("ignored".to_string()),
            ..Cli::default()
        };

        let (result, out) = run_capture(cli, &factory, &root, b"");

        result.unwrap();
        assert_eq!(out, "ged version 0.0.1\n");
        assert!(!root.exists());
        assert!(factory.builds.borrow().is_empty());
    }

    #[test]
    fn missing_script_is_usage_error_before_config_load() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "this is not json");
        let factory = StubFactory::replying(&["unused"]);

        let (result, out) = run_capture(Cli::default(), &factory, temp.path(), b"");

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenError>(),
            Some(GenError::Usage { .. })
        ));
        assert!(format!("{err:#}").contains("Usage:"));
        assert!(out.is_empty());
        assert!(factory.builds.borrow().is_empty());
        assert_eq!(report(Err(err)), 1);
    }

    #[test]
    fn configure_writes_template_once_and_then_leaves_it_alone() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("config");
        let factory = StubFactory::default();
        let configure = Cli {
            configure: true,
            ..Cli::default()
        };

        let (result, out) = run_capture(configure.clone(), &factory, &root, b"");
        result.unwrap();
        let path = resolve_path(&root);
        assert!(out.contains(&path.display().to_string()), "{out}");
        assert_eq!(config::load(&path).unwrap(), config::Config::default());

        fs::write(&path, "{\"Gemini\": {\"ApiKey\": \"edited\"}}").unwrap();
        let before = fs::read(&path).unwrap();

        let (result, out) = run_capture(configure, &factory, &root, b"");
        result.unwrap();
        assert!(out.contains("already exists"), "{out}");
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn configure_honours_explicit_config_path() {
        let temp = TempDir::new().unwrap();
        let custom = temp.path().join("elsewhere").join("ged.json");
        let cli = Cli {
            configure: true,
            config: Some(custom.clone()),
            ..Cli::default()
        };

        let (result, _) = run_capture(cli, &StubFactory::default(), temp.path(), b"");

        result.unwrap();
        assert!(custom.exists());
        assert!(!resolve_path(temp.path()).exists());
    }

    #[test]
    fn missing_config_names_path_and_never_builds_a_client() {
        let temp = TempDir::new().unwrap();
        let factory = StubFactory::replying(&["unused"]);

        let (result, out) = run_capture(ask_cli("Summarize:", None), &factory, temp.path(), b"text\n");

        let msg = format!("{:#}", result.unwrap_err());
        assert!(
            msg.contains(&resolve_path(temp.path()).display().to_string()),
            "{msg}"
        );
        assert!(msg.contains("-configure"), "{msg}");
        assert!(out.is_empty());
        assert!(factory.builds.borrow().is_empty());
    }

    #[test]
    fn prompt_is_script_newline_file_contents_and_stdin_is_untouched() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), r#"{"Gemini": {"ApiKey": "g-key"}}"#);
        let body_path = temp.path().join("body.txt");
        fs::write(&body_path, "first\nsecond\n").unwrap();
        let factory = StubFactory::replying(&["ok"]);

        let mut reader = Cursor::new(b"from stdin\n".to_vec());
        let mut out = Vec::new();
        run_with_io(
            ask_cli(" Fix grammar: ", Some(body_path)),
            &factory,
            temp.path(),
            &mut reader,
            &mut out,
        )
        .unwrap();

        assert_eq!(factory.prompts(), vec![" Fix grammar: \nfirst\nsecond\n"]);
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "from stdin\n");
    }

    #[test]
    fn stdin_first_line_is_used_without_file() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), r#"{"Gemini": {"ApiKey": "g-key"}}"#);
        let factory = StubFactory::replying(&["ok"]);

        let (result, _) = run_capture(ask_cli("Echo:", None), &factory, temp.path(), b"one\ntwo\n");

        result.unwrap();
        assert_eq!(factory.prompts(), vec!["Echo:\none"]);
    }

    #[test]
    fn fragments_are_printed_one_per_line() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), r#"{"Gemini": {"ApiKey": "g-key"}}"#);
        let factory = StubFactory::replying(&["alpha", "beta"]);

        let (result, out) = run_capture(ask_cli("s", None), &factory, temp.path(), b"t\n");

        result.unwrap();
        assert_eq!(out, "alpha\nbeta\n");
    }

    #[test]
    fn default_provider_and_its_key_come_from_config() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"{"DefaultUseService": "chatgpt", "Gemini": {"ApiKey": "g-key"}, "ChatGpt": {"ApiKey": "c-key"}}"#,
        );
        let factory = StubFactory::replying(&["ok"]);

        let (result, _) = run_capture(ask_cli("s", None), &factory, temp.path(), b"t\n");

        result.unwrap();
        assert_eq!(
            factory.builds.borrow().as_slice(),
            &[BuildCall {
                provider: Provider::ChatGpt,
                api_key: "c-key".to_string(),
                model: None,
            }]
        );
    }

    #[test]
    fn cli_provider_and_model_override_config() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"{"DefaultUseService": "chatgpt", "Gemini": {"ApiKey": "g-key"}, "ChatGpt": {"ApiKey": "c-key"}}"#,
        );
        let factory = StubFactory::replying(&["ok"]);
        let cli = Cli {
            provider: Some(Provider::Gemini),
            model: Some("gemini-1.5-flash".to_string()),
            ..ask_cli("s", None)
        };

        let (result, _) = run_capture(cli, &factory, temp.path(), b"t\n");

        result.unwrap();
        let builds = factory.builds.borrow();
        assert_eq!(builds[0].provider, Provider::Gemini);
        assert_eq!(builds[0].api_key, "g-key");
        assert_eq!(builds[0].model.as_deref(), Some("gemini-1.5-flash"));
    }

    #[test]
    fn unknown_default_provider_falls_back_to_gemini() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"{"DefaultUseService": "bard", "Gemini": {"ApiKey": "g-key"}}"#,
        );
        let factory = StubFactory::replying(&["ok"]);

        let (result, _) = run_capture(ask_cli("s", None), &factory, temp.path(), b"t\n");

        result.unwrap();
        assert_eq!(factory.builds.borrow()[0].provider, Provider::Gemini);
    }

    #[test]
    fn provider_error_is_reported_as_failure_without_output() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), r#"{"Gemini": {"ApiKey": "g-key"}}"#);
        let factory = StubFactory::failing("quota exceeded");

        let (result, out) = run_capture(ask_cli("s", None), &factory, temp.path(), b"t\n");

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("quota exceeded"));
        assert!(out.is_empty());
        assert_eq!(factory.builds.borrow().len(), 1);
        assert_eq!(report(Err(err)), 1);
    }

    #[test]
    fn unreadable_body_file_is_input_error() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), r#"{"Gemini": {"ApiKey": "g-key"}}"#);
        let factory = StubFactory::replying(&["unused"]);
        let missing = temp.path().join("nope.txt");

        let (result, _) = run_capture(ask_cli("s", Some(missing)), &factory, temp.path(), b"");

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenError>(),
            Some(GenError::InputRead { .. })
        ));
        assert!(factory.builds.borrow().is_empty());
    }

    #[test]
    fn lite_profile_requires_api_key() {
        let factory = StubFactory::replying(&["unused"]);
        let cli = LiteCli {
            script: Some("s".to_string()),
            ..LiteCli::default()
        };
        let mut reader = Cursor::new(b"t\n".to_vec());
        let mut out = Vec::new();

        let err = run_lite_with_io(cli, &factory, Some("  ".to_string()), &mut reader, &mut out)
            .unwrap_err();

        assert!(format!("{err:#}").contains(API_KEY_ENV));
        assert!(factory.builds.borrow().is_empty());
    }

    #[test]
    fn lite_profile_asks_gemini_with_env_key() {
        let factory = StubFactory::replying(&["done"]);
        let cli = LiteCli {
            script: Some("Shorten:".to_string()),
            ..LiteCli::default()
        };
        let mut reader = Cursor::new(b"a long sentence\n".to_vec());
        let mut out = Vec::new();

        run_lite_with_io(cli, &factory, Some("env-key".to_string()), &mut reader, &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "done\n");
        assert_eq!(factory.prompts(), vec!["Shorten:\na long sentence"]);
        let builds = factory.builds.borrow();
        assert_eq!(builds[0].provider, Provider::Gemini);
        assert_eq!(builds[0].api_key, "env-key");
    }
}
