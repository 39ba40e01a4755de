//! zc.buildout maker
//!
//! Bootstraps the buildout found in the install path and runs it, either as
//! a whole or part by part. `eggs` packages get one `site-packages-<tag>`
//! part per runtime variant, restricted to the parts their configuration
//! actually defines.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::error::backend::build_failed;
use crate::minibuild::Category;
use crate::process;

use super::{MakeOptions, MakeRequest, Maker};

const DEFAULT_CONFIG: &str = "buildout.cfg";

/// Buildout's record of installed parts
const INSTALLED_CFG: &str = ".installed.cfg";

pub struct BuildoutMaker;

impl BuildoutMaker {
    fn run(&self, directory: &Path, program: &str, args: &[String]) -> Result<()> {
        process::run(program, args, Some(directory), &[])
            .map(|_| ())
            .map_err(|e| build_failed(directory, e))
    }

    fn bootstrap(&self, directory: &Path, options: &MakeOptions, config: &str) -> Result<()> {
        if directory.join("bootstrap.py").is_file() {
            let python = options
                .interpreter
                .as_ref()
                .map_or_else(|| "python".to_string(), |p| p.display().to_string());
            let mut args = vec!["bootstrap.py".to_string()];
            if options.offline {
                args.push("-t".to_string());
            }
            for link in &options.find_links {
                args.push("-f".to_string());
                args.push(link.display().to_string());
            }
            args.push("-c".to_string());
            args.push(config.to_string());
            self.run(directory, &python, &args)
        } else {
            self.run(
                directory,
                "buildout",
                &["bootstrap".to_string(), "-c".to_string(), config.to_string()],
            )
        }
    }
}

/// Command line switches shared by every buildout run
fn buildout_flags(request: &MakeRequest<'_>, options: &MakeOptions) -> Vec<String> {
    let dependency_or_egg = matches!(
        request.minibuild.category,
        Category::Dependencies | Category::Eggs
    );
    let mut flags = Vec::new();
    if options.verbose {
        flags.push("-v");
    }
    if !options.upgrade && !dependency_or_egg && !request.directory.join(INSTALLED_CFG).exists() {
        flags.push("-N");
    }
    if options.upgrade || dependency_or_egg {
        flags.push("-n");
    }
    if options.offline {
        flags.push("-o");
    }
    if options.debug {
        flags.push("-D");
    }
    flags.into_iter().map(str::to_string).collect()
}

/// Parts of `candidates` that `content` declares as sections
fn declared_parts(candidates: Vec<String>, content: &str) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|part| content.contains(&format!("[{part}]")))
        .collect()
}

impl Maker for BuildoutMaker {
    fn name(&self) -> &'static str {
        "buildout"
    }

    fn get_options(&self, request: &MakeRequest<'_>) -> Result<MakeOptions> {
        let minibuild = request.minibuild;
        let config = minibuild
            .option("buildout_config")
            .unwrap_or(DEFAULT_CONFIG)
            .to_string();
        let variants: Vec<String> = request
            .variants
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        let parts = if minibuild.category == Category::Eggs {
            let content =
                std::fs::read_to_string(request.directory.join(&config)).unwrap_or_default();
            let candidates = variants
                .iter()
                .map(|tag| format!("site-packages-{tag}"))
                .chain(std::iter::once("site-packages".to_string()))
                .collect();
            declared_parts(candidates, &content)
        } else {
            minibuild
                .option("buildout_parts")
                .map(|parts| parts.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default()
        };

        let interpreter = minibuild
            .option("python")
            .map(PathBuf::from)
            .filter(|path| path.exists());

        let find_links = [
            request.prefix.join("eggs").join("cache"),
            request.prefix.join("downloads").join("dist"),
        ]
        .into_iter()
        .filter(|path| path.is_dir())
        .collect();

        Ok(MakeOptions {
            parts,
            variants,
            config_file: Some(config),
            interpreter,
            find_links,
            offline: request.offline,
            upgrade: request.upgrade,
            debug: request.debug,
            verbose: request.verbose,
            ..MakeOptions::default()
        })
    }

    fn install(&self, request: &MakeRequest<'_>, options: &MakeOptions) -> Result<()> {
        let directory = request.directory;
        let config = options.config_file.as_deref().unwrap_or(DEFAULT_CONFIG);

        if !options.upgrade
            && directory.join(INSTALLED_CFG).exists()
            && request.minibuild.category != Category::Eggs
        {
            info!(
                directory = %directory.display(),
                "already built and not upgrading, buildout will not run"
            );
            return Ok(());
        }

        info!(directory = %directory.display(), config, "running buildout");
        self.bootstrap(directory, options, config)?;

        let flags = buildout_flags(request, options);
        let buildout = directory.join("bin").join("buildout").display().to_string();
        let base = || {
            let mut args = vec!["-c".to_string(), config.to_string()];
            args.extend(flags.iter().cloned());
            args
        };

        if options.parts.is_empty() {
            debug!("installing every part");
            return self.run(directory, &buildout, &base());
        }
        for part in &options.parts {
            info!(part = %part, "installing single part");
            let mut args = base();
            args.push("install".to_string());
            args.push(part.clone());
            self.run(directory, &buildout, &args)?;
        }
        Ok(())
    }

    fn reinstall(&self, request: &MakeRequest<'_>, options: &MakeOptions) -> Result<()> {
        let installed = request.directory.join(INSTALLED_CFG);
        if installed.exists() {
            debug!(path = %installed.display(), "forcing buildout to rebuild");
            std::fs::remove_file(&installed).map_err(|e| build_failed(request.directory, e))?;
        }
        self.install(request, options)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::minibuild::Minibuild;
    use std::collections::{BTreeMap, BTreeSet};
    use tempfile::TempDir;

    fn minibuild(category: &str, extra: &[(&str, &str)]) -> Minibuild {
        let mut options = BTreeMap::from([
            ("category".to_string(), category.to_string()),
            ("src_uri".to_string(), "https://hg.example.org/pkg".to_string()),
            ("src_type".to_string(), "hg".to_string()),
            ("install_method".to_string(), "buildout".to_string()),
        ]);
        for (key, value) in extra {
            options.insert((*key).to_string(), (*value).to_string());
        }
        Minibuild::from_section("pkg", Path::new("pkg"), options).expect("valid")
    }

    fn request<'a>(
        minibuild: &'a Minibuild,
        directory: &'a Path,
        variants: Option<&'a BTreeSet<String>>,
    ) -> MakeRequest<'a> {
        MakeRequest {
            minibuild,
            directory,
            prefix: directory,
            variants,
            offline: true,
            upgrade: false,
            debug: false,
            verbose: false,
        }
    }

    #[test]
    fn test_eggs_get_declared_site_packages_parts() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(
            temp.path().join(DEFAULT_CONFIG),
            "[buildout]\nparts=\n[site-packages-2.4]\n[site-packages]\n",
        )
        .expect("write");
        let mb = minibuild("eggs", &[]);
        let variants: BTreeSet<String> = ["2.4", "2.5"].iter().map(|v| (*v).to_string()).collect();

        let options = BuildoutMaker
            .get_options(&request(&mb, temp.path(), Some(&variants)))
            .expect("options");

        assert_eq!(options.parts, vec!["site-packages-2.4", "site-packages"]);
        assert_eq!(options.variants, vec!["2.4", "2.5"]);
        assert_eq!(options.config_file.as_deref(), Some(DEFAULT_CONFIG));
    }

    #[test]
    fn test_buildout_parts_and_config_keys() {
        let temp = TempDir::new().expect("temp dir");
        let mb = minibuild(
            "dependencies",
            &[("buildout_parts", "part1 part2"), ("buildout_config", "minitage.cfg")],
        );
        let options = BuildoutMaker
            .get_options(&request(&mb, temp.path(), None))
            .expect("options");
        assert_eq!(options.parts, vec!["part1", "part2"]);
        assert_eq!(options.config_file.as_deref(), Some("minitage.cfg"));
    }

    #[test]
    fn test_flags() {
        let temp = TempDir::new().expect("temp dir");
        let mb = minibuild("dependencies", &[]);
        let req = request(&mb, temp.path(), None);
        let options = MakeOptions {
            offline: true,
            debug: true,
            ..MakeOptions::default()
        };
        assert_eq!(buildout_flags(&req, &options), vec!["-n", "-o", "-D"]);

        let other = minibuild("zope", &[]);
        let req = request(&other, temp.path(), None);
        assert_eq!(
            buildout_flags(&req, &MakeOptions::default()),
            vec!["-N".to_string()]
        );
    }

    #[test]
    fn test_installed_non_egg_is_left_alone() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join(INSTALLED_CFG), "").expect("write");
        let mb = minibuild("dependencies", &[]);
        let req = request(&mb, temp.path(), None);
        let options = BuildoutMaker.get_options(&req).expect("options");
        // would fail if it tried to bootstrap: there is no buildout here
        BuildoutMaker.install(&req, &options).expect("skipped");
    }

    #[test]
    fn test_reinstall_discards_installed_cfg() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join(INSTALLED_CFG), "").expect("write");
        let mb = minibuild("dependencies", &[]);
        let req = request(&mb, temp.path(), None);
        let options = BuildoutMaker.get_options(&req).expect("options");

        // no buildout available, so the build itself fails after the reset
        let _ = BuildoutMaker.reinstall(&req, &options);
        assert!(!temp.path().join(INSTALLED_CFG).exists());
    }
}
