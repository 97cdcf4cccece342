//! Integration tests for types

#[cfg(test)]
mod tests {
    use apkforge_types::*;

    const SPEC: &str = r"
package:
  name: hello
  version: 2.12.1
  epoch: 3
  description: GNU hello
  url: https://www.gnu.org/software/hello/
  copyright:
    - license: GPL-3.0-or-later
  dependencies:
    runtime:
      - libintl
    provides:
      - hello-bin=2.12.1
    provider-priority: 10
  scriptlets:
    post-install: |
      #!/bin/sh
      echo installed
    trigger:
      script: |
        #!/bin/sh
        ldconfig
      paths:
        - /usr/lib
subpackages:
  - name: hello-doc
    description: hello documentation
    options:
      no-provides: true
environment:
  accounts:
    users:
      - username: build
        uid: 1000
        gid: 1000
    groups:
      - groupname: build
        gid: 1000
        members: [build]
";

    #[test]
    fn test_parse_full_specification() {
        let config = Configuration::from_yaml(SPEC).unwrap();
        assert_eq!(config.package.name, "hello");
        assert_eq!(config.package.version, "2.12.1");
        assert_eq!(config.package.epoch, 3);
        assert_eq!(config.package.licenses(), vec!["GPL-3.0-or-later"]);
        assert_eq!(config.package.dependencies.runtime, vec!["libintl"]);
        assert_eq!(config.package.dependencies.provider_priority, Some(10));
        assert_eq!(config.package.scriptlets.trigger.paths, vec!["/usr/lib"]);
        assert!(config.package.scriptlets.pre_install.is_empty());

        let doc = &config.subpackages[0];
        assert_eq!(doc.name, "hello-doc");
        assert!(doc.options.no_provides);
        assert!(!doc.options.no_depends);

        assert_eq!(config.environment.accounts.build_user().unwrap().uid, 1000);
        assert_eq!(config.environment.accounts.build_group().unwrap().gid, 1000);
    }

    #[test]
    fn test_missing_version_is_rejected() {
        let err = Configuration::from_yaml("package:\n  name: x\n  version: ''\n").unwrap_err();
        assert!(err.to_string().contains("no version"));
    }

    #[test]
    fn test_unnamed_subpackage_is_rejected() {
        let input = "package:\n  name: x\n  version: '1'\nsubpackages:\n  - name: ' '\n";
        let err = Configuration::from_yaml(input).unwrap_err();
        assert!(err.to_string().contains("subpackage #0 has no name"));
    }

    #[test]
    fn test_scriptlet_files_are_in_archive_order() {
        let scriptlets = Scriptlets::default();
        let names: Vec<_> = scriptlets.files().iter().map(|(n, _)| *n).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_discovered_dependencies_json_shape() {
        let discovered = DiscoveredDependencies {
            runtime: vec!["so:libc.so.6".into()],
            provides: vec!["cmd:hello=2.12.1-r3".into()],
            vendored: vec![],
        };
        let json = serde_json::to_string(&discovered).unwrap();
        assert_eq!(
            json,
            r#"{"runtime":["so:libc.so.6"],"provides":["cmd:hello=2.12.1-r3"],"vendored":[]}"#
        );
    }

    #[test]
    fn test_arch_serde_roundtrip_uses_apk_name() {
        let arch: Arch = serde_json::from_str(r#""amd64""#).unwrap();
        assert_eq!(serde_json::to_string(&arch).unwrap(), r#""x86_64""#);
    }
}
