fn main() {
    load_dotenv();

    linker_be_nice();
    // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

/// Forwards `.env` entries to the compiler so `env!`/`option_env!` see them.
/// Variables already set in the environment win.
fn load_dotenv() {
    println!("cargo:rerun-if-changed=.env");
    for key in [
        "WIFI_SSID",
        "WIFI_PASSWORD",
        "BROKER_HOST",
        "BROKER_PORT",
        "MQTT_USER",
        "MQTT_PASSWORD",
        "MQTT_CLIENT_ID",
        "BUTTON_ACTIVE_LOW",
        "DEBOUNCE_MS",
        "FAILURE_HOLD_MS",
        "LONG_OK_HOLD_MS",
    ] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    let Ok(entries) = dotenvy::from_path_iter(".env") else {
        println!("cargo:warning=No .env file, using the build environment only (see .env.example)");
        return;
    };

    for entry in entries {
        match entry {
            Ok((key, value)) if std::env::var_os(&key).is_none() => {
                println!("cargo:rustc-env={key}={value}");
            }
            Ok(_) => {}
            Err(e) => println!("cargo:warning=Skipping malformed .env line: {e}"),
        }
    }
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_rtos_initialized" | "esp_rtos_yield_task" | "esp_rtos_task_create" => {
                    eprintln!();
                    eprintln!(
                        "💡 `esp-radio` has no scheduler enabled. Make sure you have initialized `esp-rtos` or provided an external scheduler."
                    );
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg=-Wl,--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}
