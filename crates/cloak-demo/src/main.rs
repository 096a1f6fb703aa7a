//! Cloak messaging walkthrough.
//!
//! Runs two clients against an in-process directory and message store:
//! both enroll, the sender encrypts a message, the recipient decrypts it.
//!
//! # Usage
//!
//! ```bash
//! # Alice writes to Bob, keys kept in memory
//! cloak-demo --message "Hello Bob!"
//!
//! # Persist private keys and let Bob reply
//! cloak-demo --vault-dir ./keys --reply "Hi Alice!"
//! ```

#![allow(clippy::print_stdout, reason = "CLI output")]

use std::path::PathBuf;

use clap::Parser;
use cloak_crypto::{CipherConfig, HybridCipher, RustCryptoBackend};
use cloak_messaging::{
    ConversationEntry, FileKeyVault, KeyCustody, KeyVault, MemoryKeyDirectory, MemoryKeyVault,
    MemoryMessageStore, MessageBody, MessagingError, Messenger, UserId,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type DemoMessenger = Messenger<RustCryptoBackend, MemoryKeyDirectory, MemoryMessageStore>;

/// End-to-end encrypted messaging walkthrough
#[derive(Parser, Debug)]
#[command(name = "cloak-demo")]
#[command(about = "Encrypt a message from one user to another and read it back")]
#[command(version)]
struct Args {
    /// Sending user
    #[arg(long, default_value = "alice")]
    sender: String,

    /// Receiving user
    #[arg(long, default_value = "bob")]
    recipient: String,

    /// Message text
    #[arg(short, long, default_value = "Hey Bob! This is Alice.")]
    message: String,

    /// Optional reply from the recipient
    #[arg(long)]
    reply: Option<String>,

    /// Directory for private key files (keys stay in memory if omitted)
    #[arg(long)]
    vault_dir: Option<PathBuf>,

    /// RSA modulus size for new key pairs
    #[arg(long, default_value = "2048")]
    rsa_bits: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = CipherConfig { rsa_bits: args.rsa_bits, ..Default::default() };
    let cipher = HybridCipher::new(RustCryptoBackend::new(), config)?;
    let messenger = Messenger::new(cipher, MemoryKeyDirectory::new(), MemoryMessageStore::new());

    match &args.vault_dir {
        Some(dir) => {
            tracing::info!("Keeping private keys in {}", dir.display());
            let vault = FileKeyVault::open(dir)?;
            run(&messenger, &args, vault.clone(), vault)?;
        },
        None => run(&messenger, &args, MemoryKeyVault::new(), MemoryKeyVault::new())?,
    }

    Ok(())
}

fn run<V: KeyVault>(
    messenger: &DemoMessenger,
    args: &Args,
    sender_vault: V,
    recipient_vault: V,
) -> Result<(), MessagingError> {
    let sender = KeyCustody::new(args.sender.as_str(), sender_vault);
    let recipient = KeyCustody::new(args.recipient.as_str(), recipient_vault);

    println!("Encrypted messaging walkthrough\n");

    println!("Checking encryption keys for {}...", sender.user());
    messenger.enroll(&sender)?;

    // Sending before the recipient has keys must fail without storing anything
    if let Err(e) = messenger.send(sender.user(), recipient.user(), &args.message) {
        println!("Send refused: {e}");
    }

    println!("Checking encryption keys for {}...", recipient.user());
    messenger.enroll(&recipient)?;

    println!("Encrypting and sending message...");
    let id = messenger.send(sender.user(), recipient.user(), &args.message)?;
    println!("Message {id} sent (encrypted)");

    if let Some(reply) = &args.reply {
        messenger.send(recipient.user(), sender.user(), reply)?;
        println!("Reply sent (encrypted)");
    }

    println!("\nSwitching to {}...", recipient.user());
    print_conversation(&messenger.conversation(&recipient, sender.user())?, recipient.user());

    if args.reply.is_some() {
        println!("\nSwitching to {}...", sender.user());
        print_conversation(&messenger.conversation(&sender, recipient.user())?, sender.user());
    }

    println!("\nDone.");
    Ok(())
}

fn print_conversation(entries: &[ConversationEntry], viewer: &UserId) {
    println!("Found {} message(s) for {viewer}", entries.len());

    for entry in entries {
        let text = match &entry.body {
            MessageBody::Plaintext(text) => format!("\"{text}\""),
            MessageBody::Undecryptable => "[could not decrypt]".to_string(),
            MessageBody::Outgoing => "[sent by you, encrypted for the recipient]".to_string(),
        };
        println!("  [{}] {}: {text}", entry.created_at_secs, entry.sender);
    }
}
