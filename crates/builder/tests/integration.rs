//! Integration tests for package emission

#[cfg(test)]
mod tests {
    use apkforge_builder::*;
    use apkforge_config::{BuilderConfig, GzipConcurrency};
    use apkforge_errors::{BuildError, Error};
    use apkforge_events::{AppEvent, EventReceiver, GeneralEvent, PackageEvent};
    use apkforge_signing::rsa::RsaPrivateKey;
    use apkforge_signing::{ApkSigner, RsaKeySigner};
    use apkforge_types::{
        Accounts, Arch, Configuration, Copyright, Dependencies, DiscoveredDependencies, Package,
        Subpackage,
    };
    use async_trait::async_trait;
    use std::os::unix::fs::MetadataExt;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn builder_config(root: &Path) -> BuilderConfig {
        let mut config = BuilderConfig::default();
        config.paths.out_dir = root.join("out");
        config.paths.workspace_dir = root.join("work");
        config.paths.guest_dir = root.join("guest");
        config.paths.build_log_dir = root.to_path_buf();
        config
    }

    fn hello() -> Package {
        Package {
            name: "hello".into(),
            version: "2.12".into(),
            epoch: 0,
            description: "GNU hello".into(),
            url: "https://www.gnu.org/software/hello/".into(),
            copyright: vec![Copyright {
                license: "GPL-3.0-or-later".into(),
                ..Copyright::default()
            }],
            dependencies: Dependencies {
                runtime: vec!["busybox".into()],
                ..Dependencies::default()
            },
            ..Package::default()
        }
    }

    fn stage(config: &BuilderConfig, package: &str) {
        let root = config
            .paths
            .workspace_dir
            .join("melange-out")
            .join(package);
        std::fs::create_dir_all(root.join("usr/bin")).unwrap();
        std::fs::create_dir_all(root.join("usr/share/doc")).unwrap();
        std::fs::write(root.join("usr/bin").join(package), b"#!/bin/sh\necho hello\n").unwrap();
        std::fs::write(root.join("usr/share/doc/README"), vec![b'x'; 100_000]).unwrap();
        std::os::unix::fs::symlink(package, root.join("usr/bin/hi")).unwrap();
    }

    fn setup() -> (TempDir, BuilderConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = builder_config(dir.path());
        stage(&config, "hello");
        (dir, config)
    }

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }

    fn drain_warnings(rx: &mut EventReceiver) -> Vec<String> {
        let mut warnings = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::General(GeneralEvent::Warning { message, .. }) = message.event {
                warnings.push(message);
            }
        }
        warnings
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl CompositionAnalyzer for FailingAnalyzer {
        async fn analyze(
            &self,
            _handle: &AnalysisHandle<'_>,
        ) -> Result<DiscoveredDependencies, Error> {
            Err(Error::internal("scanner crashed"))
        }
    }

    #[tokio::test]
    async fn test_unsigned_package_has_control_and_data() {
        let (_dir, config) = setup();
        let context = EmitContext::from_config(&config);
        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);

        let emitted = emit_package(&context, build, &Accounts::default(), &NoopAnalyzer)
            .await
            .unwrap();
        assert_eq!(
            emitted.path,
            config.paths.out_dir.join("x86_64/hello-2.12-r0.apk")
        );

        let apk = ApkSections::from_file(&emitted.path).await.unwrap();
        assert!(apk.signature.is_none());
        assert!(apk.signature_blob().is_none());
        assert_eq!(apk.pkginfo_value("pkgname"), Some("hello"));
        assert_eq!(apk.pkginfo_value("pkgver"), Some("2.12-r0"));
        assert_eq!(apk.pkginfo_value("arch"), Some("x86_64"));
        assert_eq!(apk.pkginfo_value("size"), Some("100021"));
        assert_eq!(apk.pkginfo_value("origin"), Some("hello"));
        assert_eq!(apk.pkginfo_value("builddate"), None);
        assert_eq!(apk.pkginfo_values("depend"), vec!["busybox"]);

        let hash = apk.verify_data_hash().unwrap();
        assert_eq!(emitted.build.data_hash, Some(hash.to_hex()));

        let paths: Vec<&str> = apk.data.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "usr/",
                "usr/bin/",
                "usr/bin/hello",
                "usr/bin/hi",
                "usr/share/",
                "usr/share/doc/",
                "usr/share/doc/README",
            ]
        );
        let binary = &apk.data.entries[2];
        assert_eq!(
            binary.checksum.as_deref(),
            Some(apkforge_hash::sha1_hex(b"#!/bin/sh\necho hello\n").as_str())
        );
        assert_eq!(binary.mtime, 0);
    }

    #[tokio::test]
    async fn test_output_is_reproducible() {
        let (dir, config) = setup();
        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);
        let accounts = Accounts::default();

        let serial = EmitContext::from_config(&config)
            .with_source_date_epoch(1_700_000_000)
            .with_gzip(GzipConcurrency {
                threads: 1,
                block_size: 32 * 1024,
            });
        let first = emit_package(&serial, build.clone(), &accounts, &NoopAnalyzer)
            .await
            .unwrap();
        let first_bytes = tokio::fs::read(&first.path).await.unwrap();

        let mut second_build = build;
        second_build.out_dir = dir.path().join("again");
        let parallel = serial.with_gzip(GzipConcurrency {
            threads: 4,
            block_size: 32 * 1024,
        });
        let second = emit_package(&parallel, second_build, &accounts, &NoopAnalyzer)
            .await
            .unwrap();
        let second_bytes = tokio::fs::read(&second.path).await.unwrap();

        assert_eq!(first_bytes, second_bytes);

        let apk = ApkSections::parse(&first_bytes).unwrap();
        assert_eq!(apk.pkginfo_value("builddate"), Some("1700000000"));
        assert!(apk.data.entries.iter().all(|e| e.mtime == 1_700_000_000));
    }

    #[tokio::test]
    async fn test_signed_package_verifies() {
        let (_dir, config) = setup();
        let signer = RsaKeySigner::new(test_key(), "packager.rsa");
        let public_key = signer.public_key();
        let context = EmitContext::from_config(&config).with_signer(Arc::new(signer));
        let build = PackageBuild::from_package(&hello(), Arch::Aarch64, &config);

        let emitted = emit_package(&context, build, &Accounts::default(), &NoopAnalyzer)
            .await
            .unwrap();
        let apk = ApkSections::from_file(&emitted.path).await.unwrap();

        let (key_name, _) = apk.signature_blob().unwrap();
        assert_eq!(key_name, "packager.rsa");
        let signature = apk.signature.as_ref().unwrap();
        assert_eq!(signature.entries.len(), 1);
        assert_eq!(signature.entries[0].path, ".SIGN.RSA.packager.rsa.pub");
        apk.verify_signature(&public_key).unwrap();
        apk.verify_data_hash().unwrap();
    }

    #[tokio::test]
    async fn test_configuration_emits_subpackages() {
        let (dir, mut config) = setup();
        config.packaging.create_build_log = true;
        stage(&config, "hello-doc");

        let configuration = Configuration {
            package: hello(),
            subpackages: vec![Subpackage {
                name: "hello-doc".into(),
                description: "hello documentation".into(),
                ..Subpackage::default()
            }],
            ..Configuration::default()
        };

        let context = EmitContext::from_config(&config);
        let artifacts = emit_configuration(
            &context,
            &configuration,
            Arch::X86_64,
            &config,
            &NoopAnalyzer,
        )
        .await
        .unwrap();

        let out = config.paths.out_dir.join("x86_64");
        assert_eq!(
            artifacts,
            vec![out.join("hello-2.12-r0.apk"), out.join("hello-doc-2.12-r0.apk")]
        );

        let doc = ApkSections::from_file(&artifacts[1]).await.unwrap();
        assert_eq!(doc.pkginfo_value("origin"), Some("hello"));
        assert_eq!(doc.pkginfo_value("pkgver"), Some("2.12-r0"));
        assert_eq!(doc.pkginfo_value("pkgdesc"), Some("hello documentation"));
        assert_eq!(doc.pkginfo_values("license"), vec!["GPL-3.0-or-later"]);

        let log = std::fs::read_to_string(dir.path().join("packages.log")).unwrap();
        let mut lines: Vec<&str> = log.lines().collect();
        lines.sort_unstable();
        assert_eq!(
            lines,
            vec![
                "x86_64|hello|hello-doc|2.12-r0",
                "x86_64|hello|hello|2.12-r0",
            ]
        );
    }

    #[tokio::test]
    async fn test_strip_origin_name() {
        let (_dir, mut config) = setup();
        config.packaging.strip_origin_name = true;
        stage(&config, "hello-doc");

        let sub = Subpackage {
            name: "hello-doc".into(),
            ..Subpackage::default()
        };
        let build = PackageBuild::from_subpackage(&hello(), &sub, Arch::X86_64, &config);
        let context = EmitContext::from_config(&config);
        let emitted = emit_package(&context, build, &Accounts::default(), &NoopAnalyzer)
            .await
            .unwrap();

        let apk = ApkSections::from_file(&emitted.path).await.unwrap();
        assert_eq!(apk.pkginfo_value("origin"), Some("hello-doc"));
    }

    #[tokio::test]
    async fn test_recorded_dependencies_and_log() {
        let (dir, config) = setup();
        let prefix = dir.path().join("deps");
        let context = EmitContext::from_config(&config).with_dependency_log(&prefix);

        let analyzer = RecordedAnalyzer::new(DiscoveredDependencies {
            runtime: vec!["so:libc.so.6".into(), "so:libfoo.so.1".into()],
            provides: vec!["cmd:hello=2.12-r0".into()],
            vendored: vec!["so:libfoo.so.1=1".into()],
        });
        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);
        let emitted = emit_package(&context, build, &Accounts::default(), &analyzer)
            .await
            .unwrap();

        let apk = ApkSections::from_file(&emitted.path).await.unwrap();
        assert_eq!(apk.pkginfo_values("depend"), vec!["busybox", "so:libc.so.6"]);
        assert_eq!(apk.pkginfo_values("provides"), vec!["cmd:hello=2.12-r0"]);
        // vendored entries are comments
        assert!(apk.pkginfo_values("vendored").is_empty());
        assert_eq!(emitted.build.dependencies.vendored, vec!["so:libfoo.so.1=1"]);

        let log = std::fs::read_to_string(dir.path().join("deps.x86_64")).unwrap();
        let recorded: DiscoveredDependencies = serde_json::from_str(&log).unwrap();
        assert_eq!(recorded, emitted.discovered);
        assert_eq!(recorded.runtime.len(), 2);
    }

    #[tokio::test]
    async fn test_configuration_dependency_log_holds_last_package() {
        let (dir, config) = setup();
        let names = ["hello-doc", "hello-dev", "hello-lang", "hello-bash", "hello-zsh"];

        let mut analyzer = RecordedAnalyzer::new(DiscoveredDependencies::default());
        for (i, name) in names.iter().enumerate() {
            stage(&config, name);
            analyzer = analyzer.with_package(
                *name,
                DiscoveredDependencies {
                    runtime: (0..=i).map(|n| format!("so:lib{n}.so")).collect(),
                    ..DiscoveredDependencies::default()
                },
            );
        }

        let configuration = Configuration {
            package: hello(),
            subpackages: names
                .iter()
                .map(|name| Subpackage {
                    name: (*name).into(),
                    ..Subpackage::default()
                })
                .collect(),
            ..Configuration::default()
        };
        let context = EmitContext::from_config(&config).with_dependency_log(dir.path().join("deps"));

        for _ in 0..4 {
            emit_configuration(&context, &configuration, Arch::X86_64, &config, &analyzer)
                .await
                .unwrap();

            let log = std::fs::read_to_string(dir.path().join("deps.x86_64")).unwrap();
            let recorded: DiscoveredDependencies = serde_json::from_str(&log).unwrap();
            assert_eq!(recorded.runtime.len(), names.len());
            assert_eq!(recorded.runtime.last().map(String::as_str), Some("so:lib4.so"));
        }
    }

    #[tokio::test]
    async fn test_unwritable_dependency_log_only_warns() {
        let (dir, config) = setup();
        let (tx, mut rx) = apkforge_events::channel();
        let context = EmitContext::from_config(&config)
            .with_dependency_log(dir.path().join("missing/deps"))
            .with_event_sender(tx);
        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);

        let emitted = emit_package(&context, build, &Accounts::default(), &NoopAnalyzer)
            .await
            .unwrap();
        assert!(emitted.path.exists());
        assert!(!dir.path().join("missing").exists());

        let warnings = drain_warnings(&mut rx);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("dependency log"));
    }

    #[tokio::test]
    async fn test_missing_build_log_dir_only_warns() {
        let (dir, config) = setup();
        let (tx, mut rx) = apkforge_events::channel();
        let context = EmitContext::from_config(&config)
            .with_build_log_dir(dir.path().join("nowhere"))
            .with_event_sender(tx);
        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);

        let emitted = emit_package(&context, build, &Accounts::default(), &NoopAnalyzer)
            .await
            .unwrap();
        ApkSections::from_file(&emitted.path)
            .await
            .unwrap()
            .verify_data_hash()
            .unwrap();

        let warnings = drain_warnings(&mut rx);
        assert_eq!(warnings, vec!["unable to record hello-2.12-r0 in build log"]);
    }

    #[tokio::test]
    async fn test_failed_data_section_keeps_previous_artifact() {
        let (_dir, config) = setup();

        // tar headers hold at most 32 bytes of user name
        let staged = config.paths.workspace_dir.join("melange-out/hello");
        let owner = std::fs::metadata(&staged).unwrap().uid();
        let etc = config.paths.guest_dir.join("etc");
        std::fs::create_dir_all(&etc).unwrap();
        std::fs::write(
            etc.join("passwd"),
            format!("{}:x:{owner}:{owner}::/:/bin/sh\n", "u".repeat(40)),
        )
        .unwrap();

        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);
        let target = build.filename();
        let out_dir = target.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(&target, b"previous artifact").unwrap();

        let (tx, mut rx) = apkforge_events::channel();
        let context = EmitContext::from_config(&config).with_event_sender(tx);
        let err = emit_package(&context, build, &Accounts::default(), &NoopAnalyzer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::DataSection { .. })));

        assert_eq!(std::fs::read(&target).unwrap(), b"previous artifact");
        let entries: Vec<_> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(entries, vec![target]);

        let mut failed_phase = None;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Package(PackageEvent::EmissionFailed { phase, .. }) = message.event {
                failed_phase = Some(phase);
            }
        }
        assert_eq!(failed_phase.as_deref(), Some("writing data section"));
    }

    #[tokio::test]
    async fn test_failed_analysis_reports_phase() {
        let (_dir, config) = setup();
        let (tx, mut rx) = apkforge_events::channel();
        let context = EmitContext::from_config(&config).with_event_sender(tx);
        let build = PackageBuild::from_package(&hello(), Arch::X86_64, &config);
        let target = build.filename();

        let err = emit_package(&context, build, &Accounts::default(), &FailingAnalyzer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::DependencyAnalysis { .. })
        ));
        assert!(!target.exists());

        let mut failed_phase = None;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Package(PackageEvent::EmissionFailed { phase, .. }) = message.event {
                failed_phase = Some(phase);
            }
        }
        assert_eq!(failed_phase.as_deref(), Some("analyzing package"));
    }

    #[tokio::test]
    async fn test_signer_trait_object() {
        let signer: Arc<dyn ApkSigner> = Arc::new(RsaKeySigner::new(test_key(), "k.rsa"));
        let context = EmitContext::default().with_signer(signer);
        assert_eq!(
            context.signer.as_ref().map(|s| s.key_name().to_string()),
            Some("k.rsa".to_string())
        );
    }
}
