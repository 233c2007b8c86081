use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use comet_llm::{init_logging, ClientConfig, LlmClient};
use std::fs;
use std::io::{self, Read};

const DEFAULT_COMMIT_PROMPT: &str = "You are an expert software engineer. Write a concise \
conventional commit message for the following diff. Reply with the commit message only.\n\n%s";

const DEFAULT_TRANSLATE_PROMPT: &str = "Translate this commit message:\n\n%s\n\n\
Target language: %s. Reply with the translation only.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let matches = Command::new("comet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate a commit message from a diff with a configured LLM provider")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("YAML file with the client configuration")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("diff")
                .long("diff")
                .value_name("FILE")
                .help("Diff to describe, read from stdin when omitted")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("prompt")
                .long("prompt")
                .value_name("FILE")
                .help("Prompt template with a %s placeholder for the diff")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("translate")
                .long("translate")
                .value_name("LANG")
                .help("Translate the generated message into this language")
                .action(ArgAction::Set),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .context("--config is required")?;
    let config: ClientConfig = serde_yaml::from_str(
        &fs::read_to_string(config_file)
            .with_context(|| format!("failed to read config file {config_file}"))?,
    )
    .with_context(|| format!("failed to parse config file {config_file}"))?;

    let diff = match matches.get_one::<String>("diff") {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read diff {path}"))?
        }
        None => {
            let mut diff = String::new();
            io::stdin()
                .read_to_string(&mut diff)
                .context("failed to read diff from stdin")?;
            diff
        }
    };
    if diff.trim().is_empty() {
        anyhow::bail!("no changes to describe");
    }

    let prompt = match matches.get_one::<String>("prompt") {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read prompt {path}"))?
        }
        None => DEFAULT_COMMIT_PROMPT.to_string(),
    };
    let translate = matches.get_one::<String>("translate").cloned();

    let client = LlmClient::new(config).context("failed to create client")?;

    let run = async {
        let message = client.generate_commit_message(&diff, &prompt).await?;
        match translate {
            Some(lang) => {
                client
                    .translate_message(DEFAULT_TRANSLATE_PROMPT, &message, &lang)
                    .await
            }
            None => Ok(message),
        }
    };

    tokio::select! {
        result = run => {
            let message = result.context("failed to generate commit message")?;
            println!("{message}");
        }
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("interrupted");
        }
    }

    Ok(())
}
