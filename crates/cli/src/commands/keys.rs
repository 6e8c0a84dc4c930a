use clap::Subcommand;
use eyre::WrapErr;
use ticketry_security::{AesHmacCipherExecutor, CipherExecutor, KeyMaterial};

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Print a fresh encryption and signing key pair
    Generate {
        /// Emit a JSON `cipher` section ready to paste into a config file
        #[arg(long)]
        json: bool,
    },
    /// Check that a key pair is usable by encrypting a probe payload
    Verify {
        #[arg(long)]
        encryption_key: String,
        #[arg(long)]
        signing_key: String,
    },
}

impl KeyCommands {
    pub fn execute(self) -> eyre::Result<()> {
        match self {
            KeyCommands::Generate { json } => {
                let keys = KeyMaterial::generate();
                if json {
                    let section = serde_json::json!({
                        "cipher": {
                            "enabled": true,
                            "encryption_key": keys.encryption_key_base64(),
                            "signing_key": keys.signing_key_base64(),
                        }
                    });
                    println!("{}", serde_json::to_string_pretty(&section)?);
                } else {
                    println!("encryption_key = {}", keys.encryption_key_base64());
                    println!("signing_key    = {}", keys.signing_key_base64());
                }
                Ok(())
            }
            KeyCommands::Verify {
                encryption_key,
                signing_key,
            } => {
                let keys = KeyMaterial::from_base64(&encryption_key, &signing_key)
                    .wrap_err("invalid key material")?;
                let cipher = AesHmacCipherExecutor::new(keys);
                let probe = b"ticketry key probe".to_vec();
                let sealed = cipher.encode(&probe)?;
                let opened = cipher.decode(&sealed)?;
                eyre::ensure!(opened == probe, "probe payload did not survive a round trip");
                tracing::info!("✓ keys are valid for {}", cipher.name());
                Ok(())
            }
        }
    }
}
