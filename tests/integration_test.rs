//! Integration tests for gpolink.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gpolink::core::{Credentials, DistinguishedName};
use gpolink::directory::MemoryDirectory;
use gpolink::error::{Error, Operation};
use gpolink::session::{DirectorySession, LinkOutcome};

const DOMAIN: &str = "corp.local";
const USER: &str = "admin";
const PASSWORD: &str = "Passw0rd!";

const GPO: &str = "CN={6AC1786C-016F-11D2-945F-00C04FB984F9},CN=Policies,CN=System,DC=corp,DC=local";
const OTHER_GPO: &str =
    "CN={31B2F340-016D-11D2-945F-00C04FB984F9},CN=Policies,CN=System,DC=corp,DC=local";
const SERVERS: &str = "OU=Servers,DC=corp,DC=local";
const WORKSTATIONS: &str = "OU=Workstations,DC=corp,DC=local";
const KIOSKS: &str = "OU=Kiosks,DC=corp,DC=local";

fn dn(s: &str) -> DistinguishedName {
    DistinguishedName::parse(s).expect("valid DN")
}

fn creds() -> Credentials {
    Credentials::new("10.1.10.1", DOMAIN, USER, PASSWORD)
}

fn segment(gpo: &str) -> String {
    format!("[LDAP://{gpo};0]")
}

/// Domain with two GPOs and three OUs; `SERVERS` carries `servers_gplink`.
fn corp(servers_gplink: Option<&str>) -> MemoryDirectory {
    MemoryDirectory::new()
        .with_account(DOMAIN, USER, PASSWORD)
        .with_object("DC=corp,DC=local", None)
        .with_object("CN=Policies,CN=System,DC=corp,DC=local", None)
        .with_object(GPO, None)
        .with_object(OTHER_GPO, None)
        .with_object(SERVERS, servers_gplink)
        .with_object(WORKSTATIONS, None)
        .with_object(KIOSKS, None)
}

mod connect_tests {
    use super::*;

    #[test]
    fn test_valid_credentials_bind() {
        let mut dir = corp(None);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert!(session.list_links(&dn(GPO)).expect("list").is_empty());
        session.close().expect("close");
        assert!(!dir.is_bound());
    }

    #[test]
    fn test_each_corrupted_field_fails_authentication() {
        let corrupted = [
            Credentials::new("10.1.10.1", "other.local", USER, PASSWORD),
            Credentials::new("10.1.10.1", DOMAIN, "mallory", PASSWORD),
            Credentials::new("10.1.10.1", DOMAIN, USER, "wrong"),
            Credentials::new(
                "10.1.10.1",
                DOMAIN,
                USER,
                "aad3b435b51404eeaad3b435b51404ee:31d6cfe0d16ae931b73c59d7e0c089c0",
            ),
        ];

        for bad in corrupted {
            let mut dir = corp(None);
            let err = DirectorySession::bind(&mut dir, &bad)
                .err()
                .expect("bind should fail");
            assert!(matches!(err, Error::Authentication { .. }), "{err}");
            assert_eq!(err.exit_code(), 3);
            assert!(!dir.is_bound());
            assert_eq!(dir.writes(), 0);
        }
    }

    #[test]
    fn test_hash_bind_checks_only_the_nt_half() {
        let hash = "aad3b435b51404eeaad3b435b51404ee:31d6cfe0d16ae931b73c59d7e0c089c0";
        let mut dir = MemoryDirectory::new().with_account(DOMAIN, USER, hash);
        let creds = Credentials::new("dc", DOMAIN, USER, ":31D6CFE0D16AE931B73C59D7E0C089C0");
        assert!(DirectorySession::bind(&mut dir, &creds).is_ok());

        let creds = Credentials::new("dc", DOMAIN, USER, "31d6cfe0d16ae931b73c59d7e0c089c0");
        assert!(DirectorySession::bind(&mut dir, &creds).is_err());
    }

    #[test]
    fn test_hash_bind_needs_an_account_name() {
        let user = "CN=admin,CN=Users,DC=corp,DC=local";
        let hash = ":31d6cfe0d16ae931b73c59d7e0c089c0";
        let mut dir = MemoryDirectory::new().with_account(DOMAIN, user, hash);
        let err = DirectorySession::bind(&mut dir, &Credentials::new("dc", DOMAIN, user, hash))
            .err()
            .expect("bind should fail");
        assert!(matches!(err, Error::Authentication { .. }));
    }
}

mod link_tests {
    use super::*;

    #[test]
    fn test_link_appends_after_existing_segment() {
        let existing = segment(OTHER_GPO);
        let mut dir = corp(Some(&existing));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert_eq!(
            session.link_gpo(&dn(GPO), &dn(SERVERS)).expect("link"),
            LinkOutcome::Linked
        );
        drop(session);
        assert_eq!(
            dir.gplink_of(SERVERS).expect("gPLink set"),
            format!("{}{}", segment(OTHER_GPO), segment(GPO))
        );
    }

    #[test]
    fn test_link_is_idempotent() {
        let mut dir = corp(None);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert_eq!(
            session.link_gpo(&dn(GPO), &dn(SERVERS)).expect("first"),
            LinkOutcome::Linked
        );
        assert_eq!(
            session.link_gpo(&dn(GPO), &dn(SERVERS)).expect("second"),
            LinkOutcome::AlreadyLinked
        );
        drop(session);
        assert_eq!(dir.gplink_of(SERVERS), Some(segment(GPO).as_str()));
        assert_eq!(dir.writes(), 1);
    }

    #[test]
    fn test_already_linked_with_other_flags_is_noop() {
        let existing = format!("[LDAP://{};2]", GPO.to_lowercase());
        let mut dir = corp(Some(&existing));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert_eq!(
            session.link_gpo(&dn(GPO), &dn(SERVERS)).expect("link"),
            LinkOutcome::AlreadyLinked
        );
        drop(session);
        assert_eq!(dir.gplink_of(SERVERS), Some(existing.as_str()));
        assert_eq!(dir.writes(), 0);
    }

    #[test]
    fn test_link_missing_target_is_lookup_error() {
        let mut dir = corp(None);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let err = session
            .link_gpo(&dn(GPO), &dn("OU=Ghost,DC=corp,DC=local"))
            .unwrap_err();
        match err {
            Error::Lookup { operation, dn } => {
                assert_eq!(operation, Operation::Link);
                assert_eq!(dn, "OU=Ghost,DC=corp,DC=local");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_link_without_write_access_is_permission_error() {
        let mut dir = corp(None).deny_write(SERVERS);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let err = session.link_gpo(&dn(GPO), &dn(SERVERS)).unwrap_err();
        assert!(matches!(err, Error::Permission { .. }));
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains(SERVERS));
        drop(session);
        assert_eq!(dir.gplink_of(SERVERS), None);
    }
}

mod unlink_tests {
    use super::*;

    #[test]
    fn test_unlink_keeps_other_segments() {
        let existing = format!("{}{}", segment(GPO), segment(OTHER_GPO));
        let mut dir = corp(Some(&existing));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert_eq!(
            session.unlink_gpo(&dn(GPO), &dn(SERVERS)).expect("unlink"),
            LinkOutcome::Unlinked
        );
        drop(session);
        assert_eq!(dir.gplink_of(SERVERS), Some(segment(OTHER_GPO).as_str()));
    }

    #[test]
    fn test_unlink_not_linked_is_noop() {
        let existing = segment(OTHER_GPO);
        let mut dir = corp(Some(&existing));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert_eq!(
            session.unlink_gpo(&dn(GPO), &dn(SERVERS)).expect("unlink"),
            LinkOutcome::NotLinked
        );
        assert_eq!(
            session.unlink_gpo(&dn(GPO), &dn(WORKSTATIONS)).expect("unlink"),
            LinkOutcome::NotLinked
        );
        drop(session);
        assert_eq!(dir.gplink_of(SERVERS), Some(existing.as_str()));
        assert_eq!(dir.writes(), 0);
    }

    #[test]
    fn test_unlink_missing_target_is_lookup_error() {
        let mut dir = corp(None);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let err = session
            .unlink_gpo(&dn(GPO), &dn("OU=Ghost,DC=corp,DC=local"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lookup {
                operation: Operation::Unlink,
                ..
            }
        ));
    }

    #[test]
    fn test_unlink_without_write_access_is_permission_error() {
        let existing = segment(GPO);
        let mut dir = corp(Some(&existing)).deny_write(SERVERS);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let err = session.unlink_gpo(&dn(GPO), &dn(SERVERS)).unwrap_err();
        assert!(matches!(err, Error::Permission { .. }));
    }

    #[test]
    fn test_link_then_unlink_restores_value() {
        let original = format!("{}[LDAP://CN=Third,DC=corp,DC=local;1]", segment(OTHER_GPO));
        let mut dir = corp(Some(&original));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        session.link_gpo(&dn(GPO), &dn(SERVERS)).expect("link");
        session.unlink_gpo(&dn(GPO), &dn(SERVERS)).expect("unlink");
        drop(session);
        assert_eq!(dir.gplink_of(SERVERS), Some(original.as_str()));
    }
}

mod list_tests {
    use super::*;

    #[test]
    fn test_lists_exactly_the_linking_containers() {
        let both = format!("{}{}", segment(OTHER_GPO), segment(GPO));
        let mut dir = corp(Some(&both))
            .with_object("OU=Labs,DC=corp,DC=local", Some(&segment(GPO)))
            .with_object("OU=Finance,DC=corp,DC=local", Some(&segment(OTHER_GPO)));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");

        let links = session.list_links(&dn(GPO)).expect("list");
        let targets: Vec<&str> = links.iter().map(|l| l.target.as_str()).collect();
        assert_eq!(targets, vec![SERVERS, "OU=Labs,DC=corp,DC=local"]);
    }

    #[test]
    fn test_list_reflects_link_and_unlink() {
        let mut dir = corp(None);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let gpo = dn(GPO);

        session.link_gpo(&gpo, &dn(KIOSKS)).expect("link");
        let links = session.list_links(&gpo).expect("list");
        assert!(links.iter().any(|l| l.target == KIOSKS));

        session.unlink_gpo(&gpo, &dn(KIOSKS)).expect("unlink");
        let links = session.list_links(&gpo).expect("list");
        assert!(links.iter().all(|l| l.target != KIOSKS));
    }

    #[test]
    fn test_list_reports_link_state() {
        let value = format!("[LDAP://{GPO};3]");
        let mut dir = corp(Some(&value));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let links = session.list_links(&dn(GPO)).expect("list");
        assert_eq!(links.len(), 1);
        assert!(!links[0].enabled);
        assert!(links[0].enforced);
    }

    #[test]
    fn test_list_missing_gpo_is_lookup_error() {
        let mut dir = corp(None);
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let err = session
            .list_links(&dn("CN={0000},CN=Policies,CN=System,DC=corp,DC=local"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lookup {
                operation: Operation::ListLinks,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_list_agrees_with_link_for_spaced_gpo_dn() {
        let mut dir = corp(Some(&segment(GPO)));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let spaced = dn(&GPO.replace(',', ", "));

        assert_eq!(
            session.link_gpo(&spaced, &dn(SERVERS)).expect("link"),
            LinkOutcome::AlreadyLinked
        );
        let links = session.list_links(&spaced).expect("list");
        let targets: Vec<&str> = links.iter().map(|l| l.target.as_str()).collect();
        assert_eq!(targets, vec![SERVERS]);
    }

    #[test]
    fn test_list_finds_links_stored_with_spaces() {
        let stored = format!("[LDAP://{};0]", GPO.replace(',', " , ").to_lowercase());
        let mut dir = corp(Some(&stored));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        let links = session.list_links(&dn(GPO)).expect("list");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, SERVERS);
    }

    #[test]
    fn test_list_ignores_prefix_lookalikes() {
        let lookalike = format!("[LDAP://CN=Child,{GPO};0]");
        let mut dir = corp(Some(&lookalike));
        let mut session = DirectorySession::bind(&mut dir, &creds()).expect("bind");
        assert!(session.list_links(&dn(GPO)).expect("list").is_empty());
    }
}

/// Command dispatch against the in-memory directory.
mod cli_tests {
    use super::*;
    use clap::Parser;
    use gpolink::cli::{Cli, OutputFormat, normalize_args, run};
    use gpolink::config::Config;

    fn config(extra: &[&str]) -> Config {
        let mut args = vec![
            "gpolink", "-dc", "10.1.10.1", "-d", DOMAIN, "-u", USER, "-p", PASSWORD, "-g", GPO,
        ];
        args.extend_from_slice(extra);
        let cli = Cli::try_parse_from(normalize_args(args)).expect("parse");
        Config::try_from(&cli).expect("config")
    }

    fn run_on(dir: &mut MemoryDirectory, config: &Config, format: OutputFormat) -> gpolink::Result<String> {
        let session = DirectorySession::bind(dir, &config.credentials)?;
        run(session, config, format)
    }

    #[test]
    fn test_list_prints_one_dn_per_line() {
        let value = segment(GPO);
        let mut dir = corp(Some(&value)).with_object("OU=Labs,DC=corp,DC=local", Some(&value));
        let output = run_on(&mut dir, &config(&[]), OutputFormat::Text).expect("run");
        assert_eq!(output, format!("{SERVERS}\nOU=Labs,DC=corp,DC=local\n"));
        assert!(!dir.is_bound());
    }

    #[test]
    fn test_link_then_show_links() {
        let mut dir = corp(None);
        let output = run_on(&mut dir, &config(&["-l", KIOSKS, "-s"]), OutputFormat::Text)
            .expect("run");
        assert!(output.starts_with(&format!("Linked GPO {GPO} to {KIOSKS}")));
        assert!(output.contains(&format!("  {KIOSKS}\n")));
    }

    #[test]
    fn test_unlink_noop_json() {
        let mut dir = corp(None);
        let output = run_on(&mut dir, &config(&["-ul", SERVERS]), OutputFormat::Json)
            .expect("run");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["outcome"], "not_linked");
        assert_eq!(value["changed"], false);
    }

    #[test]
    fn test_session_released_after_failure() {
        let mut dir = corp(None);
        let err = run_on(
            &mut dir,
            &config(&["-l", "OU=Ghost,DC=corp,DC=local"]),
            OutputFormat::Text,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Lookup { .. }));
        assert!(!dir.is_bound());
    }
}

mod property_tests {
    use super::*;
    use gpolink::core::GpLink;
    use proptest::prelude::*;

    fn gpo_dn() -> impl Strategy<Value = String> {
        "[0-9A-F]{8}".prop_map(|id| format!("CN={{{id}}},CN=Policies,CN=System,DC=corp,DC=local"))
    }

    fn other_segments() -> impl Strategy<Value = String> {
        prop::collection::vec(("[a-z]{1,8}", 0u32..4), 0..5).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(name, flags)| format!("[LDAP://CN=Other{name},DC=corp,DC=local;{flags}]"))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn link_twice_equals_link_once(gpo in gpo_dn(), original in other_segments()) {
            let gpo = dn(&gpo);
            let mut once = GpLink::parse(&original).unwrap();
            once.link(&gpo);
            let mut twice = once.clone();
            prop_assert!(!twice.link(&gpo));
            prop_assert_eq!(once.to_string(), twice.to_string());
        }

        #[test]
        fn unlink_absent_leaves_value_unchanged(gpo in gpo_dn(), original in other_segments()) {
            let mut value = GpLink::parse(&original).unwrap();
            prop_assert!(!value.unlink(&dn(&gpo)));
            prop_assert_eq!(value.to_string(), original);
        }

        #[test]
        fn link_then_unlink_round_trips(gpo in gpo_dn(), original in other_segments()) {
            let gpo = dn(&gpo);
            let mut value = GpLink::parse(&original).unwrap();
            prop_assert!(value.link(&gpo));
            prop_assert!(value.find(&gpo).is_some());
            prop_assert!(value.unlink(&gpo));
            prop_assert_eq!(value.to_string(), original);
        }

        #[test]
        fn session_round_trip_preserves_directory(gpo in gpo_dn(), original in other_segments()) {
            let initial = (!original.is_empty()).then_some(original.as_str());
            let mut dir = corp(initial).with_object(&gpo, None);
            let gpo = dn(&gpo);
            let mut session = DirectorySession::bind(&mut dir, &creds()).unwrap();
            prop_assert_eq!(session.link_gpo(&gpo, &dn(SERVERS)).unwrap(), LinkOutcome::Linked);
            prop_assert_eq!(session.unlink_gpo(&gpo, &dn(SERVERS)).unwrap(), LinkOutcome::Unlinked);
            drop(session);
            prop_assert_eq!(dir.gplink_of(SERVERS), initial);
        }
    }
}

/// Binary-level checks that need no domain controller.
mod binary_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn gpolink() -> Command {
        let mut cmd = Command::cargo_bin("gpolink").expect("binary built");
        for var in ["GPOLINK_DC", "GPOLINK_USERNAME", "GPOLINK_PASSWORD", "GPOLINK_DOMAIN", "RUST_LOG"] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn test_help_exits_zero() {
        gpolink()
            .arg("-h")
            .assert()
            .success()
            .stdout(predicate::str::contains("--gpodn"))
            .stdout(predicate::str::contains("--ul"));
    }

    #[test]
    fn test_missing_required_args_fail() {
        gpolink().args(["-g", "CN=G,DC=c"]).assert().failure();
    }

    #[test]
    fn test_malformed_gpo_dn_fails_before_connecting() {
        gpolink()
            .args([
                "-dc", "192.0.2.1", "-d", "corp.local", "-u", "john", "-p", "x", "-g", "not-a-dn",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not a distinguished name"));
    }

    #[test]
    fn test_malformed_target_json_error() {
        gpolink()
            .args([
                "-dc", "192.0.2.1", "-d", "corp.local", "-u", "john", "-p", "x", "-g",
                "CN=G,DC=corp,DC=local", "-l", "Servers", "--format", "json",
            ])
            .assert()
            .code(2)
            .stdout(predicate::str::contains("MALFORMED_INPUT"));
    }

    #[test]
    fn test_unreachable_server_is_authentication_failure() {
        gpolink()
            .args([
                "-dc", "127.0.0.1", "--port", "1", "--timeout", "2", "-d", "corp.local", "-u",
                "john", "-p", "x", "-g", "CN=G,DC=corp,DC=local",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("authentication to 127.0.0.1 failed"));
    }
}
