use dashboard_gate::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic};

// --- Setup/Teardown Utilities ---

const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "SESSION_SECRET",
    "SESSION_TTL_SECS",
    "AUTH_PROVIDER_URL",
    "LOCAL_USERS",
    "PUBLIC_ROUTES",
    "PROTECTED_SUB_ROUTES",
    "LOGIN_ROUTE",
    "HOME_ROUTE",
];

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(String, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("AUTH_PROVIDER_URL", "https://idp.internal/exchange");
            }
            // SESSION_SECRET is missing
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic on a missing session secret"
    );
}

#[test]
#[serial]
fn test_app_config_production_requires_provider() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("SESSION_SECRET", "prod-secret");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.session_ttl_secs, 12 * 60 * 60);
    assert!(config.auth_provider_url.is_none());
    assert_eq!(
        config.local_users,
        vec![("admin".to_string(), "admin".to_string())]
    );
    assert_eq!(config.routes.root_route, "/");
    assert_eq!(config.routes.login_route, "/login");
    assert!(config.routes.protected_sub_routes.is_empty());
    assert!(!config.secure_cookies());
}

#[test]
#[serial]
fn test_app_config_route_overrides() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("PUBLIC_ROUTES", "/login, /profile ,,/health");
            env::set_var("PROTECTED_SUB_ROUTES", "profile-info");
            env::set_var("HOME_ROUTE", "/dashboard");
            env::set_var("SESSION_TTL_SECS", "3600");
        }
        AppConfig::load()
    });

    assert_eq!(
        config.routes.public_routes,
        vec!["/login".to_string(), "/profile".to_string(), "/health".to_string()]
    );
    assert_eq!(config.routes.protected_sub_routes, vec!["profile-info".to_string()]);
    assert_eq!(config.routes.home_route, "/dashboard");
    assert_eq!(config.session_ttl_secs, 3600);
}

#[test]
#[serial]
fn test_app_config_rejects_zero_ttl() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("SESSION_TTL_SECS", "0");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_app_config_production_cookies_are_secure() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("SESSION_SECRET", "prod-secret");
            env::set_var("AUTH_PROVIDER_URL", "https://idp.internal/exchange");
            env::set_var("LOCAL_USERS", "admin:admin");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert!(config.secure_cookies());
    // The static table is never loaded in production.
    assert!(config.local_users.is_empty());
}

#[test]
#[serial]
fn test_app_config_rejects_ttl_beyond_one_year() {
    for raw in ["31536001", "9000000000000", "18446744073709551615"] {
        let result = run_with_env(|| {
            panic::catch_unwind(|| {
                unsafe {
                    env::set_var("SESSION_TTL_SECS", raw);
                }
                AppConfig::load()
            })
        });

        assert!(result.is_err(), "SESSION_TTL_SECS={raw} should be refused");
    }
}

#[test]
#[serial]
fn test_app_config_accepts_one_year_ttl() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("SESSION_TTL_SECS", "31536000");
        }
        AppConfig::load()
    });

    assert_eq!(config.session_ttl_secs, 31_536_000);
    assert_eq!(config.session_ttl(), chrono::Duration::days(365));
}

#[test]
fn test_session_ttl_is_capped_for_hand_built_configs() {
    let config = AppConfig {
        session_ttl_secs: u64::MAX,
        ..AppConfig::default()
    };
    assert_eq!(config.session_ttl(), chrono::Duration::days(365));
}
