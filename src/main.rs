//! `deepask`: ask a DeepSeek model a question, translate a phrase or explain a
//! word, with a live status line while the answer is on its way.

use clap::Parser;
use crossterm::style::Stylize;
use deepask::{
    animation::Animation, key, Client, Config, Key, PromptType, Session,
    SharedOutput,
};

/// Ask DeepSeek from the terminal. Without a mode flag the text is answered
/// as a question. Every exchange is appended to a log in the data directory.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(clap::ArgGroup::new("mode").multiple(false)))]
struct Args {
    /// Text to send. Several words are joined with spaces, so quotes are
    /// optional.
    #[arg(required_unless_present_any = ["list_models", "balance"])]
    text: Vec<String>,

    /// Detect Chinese, English or Japanese and translate into the other two.
    #[arg(short = 'r', long, group = "mode")]
    translate: bool,
    /// Explain a word or phrase and save it to the word store.
    #[arg(short, long, group = "mode")]
    word: bool,
    /// Translate Chinese into Japanese carefully.
    #[arg(short = 'j', long, group = "mode")]
    translate_jp: bool,
    /// Explain a sentence: hard words, usage and a translation.
    #[arg(short, long, group = "mode")]
    sentence: bool,
    /// List English synonyms.
    #[arg(short, long, group = "mode")]
    en_synonyms: bool,

    /// Show the answer as it is generated.
    #[arg(short = 't', long, conflicts_with = "no_stream")]
    stream: bool,
    /// Wait for the whole answer.
    #[arg(short = 'f', long)]
    no_stream: bool,
    /// Status animation.
    #[arg(long, value_enum)]
    animation: Option<Animation>,

    /// List the models available to your key and exit.
    #[arg(long, conflicts_with = "balance")]
    list_models: bool,
    /// Show your account balance and exit.
    #[arg(long)]
    balance: bool,
}

impl Args {
    fn prompt_type(&self) -> PromptType {
        if self.translate {
            PromptType::FastTranslate
        } else if self.word {
            PromptType::ExplainWord
        } else if self.translate_jp {
            PromptType::TranslateJp
        } else if self.sentence {
            PromptType::ExplainSentence
        } else if self.en_synonyms {
            PromptType::EnSynonyms
        } else {
            PromptType::DefaultAnswer
        }
    }

    /// Command line flags win over the config file.
    fn streaming(&self, configured: bool) -> bool {
        if self.stream {
            true
        } else if self.no_stream {
            false
        } else {
            configured
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostics go to stderr, controlled by RUST_LOG.
    env_logger::init();

    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(animation) = args.animation {
        config.animation = animation;
    }
    let streaming = args.streaming(config.stream);

    // Checked before anything else happens.
    let key = match Key::from_env() {
        Ok(key) => key,
        Err(error) => {
            eprintln!("{} {}", "✗".red(), error);
            eprintln!("Set {} to your DeepSeek API key.", key::ENV_VAR);
            std::process::exit(1);
        }
    };
    let client = Client::from_key(key)?.with_base_url(config.base_url.clone());

    if args.list_models {
        for model in client.models().await?.data {
            println!("{}", model.id);
        }
        return Ok(());
    }
    if args.balance {
        println!("{}", client.balance().await?);
        return Ok(());
    }

    let session = Session::new(
        client,
        config.request()?,
        SharedOutput::stdout(),
        &config.data_dir(),
    )
    .animation(config.animation)
    .typing_delay(config.typing_delay());

    let text = args.text.join(" ");
    let prompt_type = args.prompt_type();

    // Dropping `ask` on interrupt also drops the animation and the request,
    // so nothing keeps drawing after the message below.
    tokio::select! {
        report = session.ask(prompt_type, &text, streaming) => {
            log::debug!(
                "{} finished as {} in {:?}",
                report.prompt_type,
                report.outcome.state(),
                report.elapsed
            );
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} Interrupted", "!".yellow());
        }
    }

    Ok(())
}
