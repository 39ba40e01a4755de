//! Shell script maker
//!
//! Runs the minibuild's `install_command` with `sh -c` inside the install
//! path, once per variant with `MINIMERGE_VARIANT` set, or once unvaried.

use tracing::info;

use crate::error::backend::build_failed;
use crate::error::{MinimergeError, Result};
use crate::process;

use super::{MakeOptions, MakeRequest, Maker};

pub struct ScriptMaker;

impl Maker for ScriptMaker {
    fn name(&self) -> &'static str {
        "script"
    }

    fn get_options(&self, request: &MakeRequest<'_>) -> Result<MakeOptions> {
        let minibuild = request.minibuild;
        let command = minibuild
            .option("install_command")
            .ok_or_else(|| MinimergeError::InvalidMinibuild {
                name: minibuild.name.clone(),
                path: minibuild.path.display().to_string(),
                reason: "the script maker needs 'install_command'".to_string(),
            })?;
        Ok(MakeOptions {
            variants: request
                .variants
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
            command: Some(command.to_string()),
            offline: request.offline,
            upgrade: request.upgrade,
            debug: request.debug,
            verbose: request.verbose,
            ..MakeOptions::default()
        })
    }

    fn install(&self, request: &MakeRequest<'_>, options: &MakeOptions) -> Result<()> {
        let Some(command) = options.command.as_deref() else {
            return Err(build_failed(request.directory, "no command to run"));
        };
        let prefix = request.prefix.to_string_lossy();
        let flag = |on: bool| if on { "1" } else { "" };
        let base = [
            ("MINIMERGE_PREFIX", &*prefix),
            ("MINIMERGE_PACKAGE", request.minibuild.name.as_str()),
            ("MINIMERGE_OFFLINE", flag(options.offline)),
            ("MINIMERGE_UPGRADE", flag(options.upgrade)),
        ];

        let variants: Vec<Option<&str>> = if options.variants.is_empty() {
            vec![None]
        } else {
            options.variants.iter().map(|v| Some(v.as_str())).collect()
        };
        for variant in variants {
            info!(
                package = %request.minibuild.name,
                variant = variant.unwrap_or("-"),
                "running install command"
            );
            let mut env = base.to_vec();
            if let Some(variant) = variant {
                env.push(("MINIMERGE_VARIANT", variant));
            }
            process::run_shell(command, request.directory, &env)
                .map_err(|e| build_failed(request.directory, e))?;
        }
        Ok(())
    }
}
