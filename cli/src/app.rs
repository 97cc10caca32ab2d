use anyhow::{Context, Result};
use colored::*;
use concierge_widget::controller::RESET_COMMANDS;
use concierge_widget::reservation::{normalize_party_size, ReservationForm};
use concierge_widget::theme::THEME_PALETTE;
use concierge_widget::{ChatController, QuickAction};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::camera::ImageFileCamera;
use crate::output::{print_chat_commands, print_theme_palette};

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    Quick(QuickAction),
    Book(ReservationForm),
    Camera(PathBuf),
    Detail(String),
    ToggleTts,
    ToggleAvatar,
    ToggleTransparent,
    /// Open the palette, or pick a colour (a CSS value or a palette number)
    Theme(Option<String>),
    Reset,
    Help,
    Quit,
    /// A slash command that could not be understood, with a hint
    Invalid(String),
    Empty,
}

pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::Empty;
    }
    if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Command::Message(input.to_string());
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match name {
        "reserve" => Command::Quick(QuickAction::Reservation),
        "recommend" => Command::Quick(QuickAction::Recommend),
        "faq" => Command::Quick(QuickAction::Faq),
        "book" => {
            if args.len() < 4 {
                return Command::Invalid("usage: /book <YYYY-MM-DD> <HH:MM> <人数> <お名前>".to_string());
            }
            Command::Book(ReservationForm {
                date: args[0].to_string(),
                time: args[1].to_string(),
                party_size: normalize_party_size(args[2]),
                name: args[3..].join(" "),
            })
        }
        "camera" => match args.first() {
            Some(_) => Command::Camera(PathBuf::from(args.join(" "))),
            None => Command::Invalid("usage: /camera <png-file>".to_string()),
        },
        "detail" => match args.first() {
            Some(id) => Command::Detail(id.to_string()),
            None => Command::Invalid("usage: /detail <id>".to_string()),
        },
        "tts" => Command::ToggleTts,
        "avatar" => Command::ToggleAvatar,
        "transparent" => Command::ToggleTransparent,
        "theme" => Command::Theme(args.first().map(|color| resolve_theme_color(color))),
        "reset" => Command::Reset,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command /{}", other)),
    }
}

/// `1`..`6` select a palette swatch; anything else is taken as a colour.
fn resolve_theme_color(input: &str) -> String {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| THEME_PALETTE.get(index))
        .map(|color| color.to_string())
        .unwrap_or_else(|| input.to_string())
}

/// Runs a single query mode, sending one message and printing the reply
pub async fn run_single_query(prompt: String, controller: &mut ChatController) -> Result<()> {
    info!("Running single query: {}", prompt);
    controller.send_message(&prompt).await;
    Ok(())
}

/// Runs an interactive chat session. Returns when the visitor quits or
/// stdin closes.
pub async fn run_interactive_chat(controller: &mut ChatController, camera: &ImageFileCamera) -> Result<()> {
    println!("Type '/help' for commands, '/quit' to end the session.");
    println!();

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            break;
        }

        let command = parse_command(&input);
        debug!(?command, "Parsed input");
        match command {
            Command::Empty => continue,
            Command::Quit => {
                controller.close_chat();
                println!("Exiting chat session.");
                break;
            }
            Command::Help => print_chat_commands(),
            Command::Invalid(hint) => println!("{}", hint.yellow()),
            Command::Message(text) => controller.send_message(&text).await,
            Command::Quick(action) => controller.quick_action(action),
            Command::Book(form) => {
                controller.submit_reservation(&form);
            }
            Command::Camera(path) => {
                camera.load(path);
                controller.open_camera().await;
                controller.capture_and_send().await;
            }
            Command::Detail(id) => controller.show_product_detail(&id),
            Command::ToggleTts => controller.toggle_tts(),
            Command::ToggleAvatar => controller.toggle_avatar(),
            Command::ToggleTransparent => controller.toggle_transparent(),
            Command::Theme(None) => {
                controller.toggle_theme_picker();
                if controller.session().theme_picker_open {
                    print_theme_palette();
                }
            }
            Command::Theme(Some(color)) => controller.choose_theme_color(&color),
            Command::Reset => controller.send_message(RESET_COMMANDS[0]).await,
        }

        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_command("  おすすめは？ \n"),
            Command::Message("おすすめは？".to_string())
        );
        assert_eq!(parse_command("   "), Command::Empty);
        assert_eq!(parse_command("exit"), Command::Quit);
    }

    #[test]
    fn quick_actions_and_toggles() {
        assert_eq!(parse_command("/reserve"), Command::Quick(QuickAction::Reservation));
        assert_eq!(parse_command("/recommend"), Command::Quick(QuickAction::Recommend));
        assert_eq!(parse_command("/faq"), Command::Quick(QuickAction::Faq));
        assert_eq!(parse_command("/tts"), Command::ToggleTts);
        assert_eq!(parse_command("/avatar"), Command::ToggleAvatar);
        assert_eq!(parse_command("/transparent"), Command::ToggleTransparent);
        assert_eq!(parse_command("/reset"), Command::Reset);
        assert_eq!(parse_command("/quit"), Command::Quit);
    }

    #[test]
    fn book_fills_the_form() {
        let Command::Book(form) = parse_command("/book 2026-10-24 18:00 2 田中 太郎") else {
            panic!("expected a booking");
        };
        assert_eq!(form.date, "2026-10-24");
        assert_eq!(form.time, "18:00");
        assert_eq!(form.party_size, "2名");
        assert_eq!(form.name, "田中 太郎");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn incomplete_commands_are_invalid() {
        assert!(matches!(parse_command("/book 2026-10-24 18:00"), Command::Invalid(_)));
        assert!(matches!(parse_command("/detail"), Command::Invalid(_)));
        assert!(matches!(parse_command("/camera"), Command::Invalid(_)));
        assert!(matches!(parse_command("/dance"), Command::Invalid(_)));
    }

    #[test]
    fn theme_takes_a_swatch_number_or_colour() {
        assert_eq!(parse_command("/theme"), Command::Theme(None));
        assert_eq!(parse_command("/theme 3"), Command::Theme(Some(THEME_PALETTE[2].to_string())));
        assert_eq!(parse_command("/theme 9"), Command::Theme(Some("9".to_string())));
        assert_eq!(parse_command("/theme #123456"), Command::Theme(Some("#123456".to_string())));
    }

    #[test]
    fn detail_and_camera_take_arguments() {
        assert_eq!(parse_command("/detail menu_2"), Command::Detail("menu_2".to_string()));
        assert_eq!(
            parse_command("/camera shots/menu.png"),
            Command::Camera(PathBuf::from("shots/menu.png"))
        );
    }
}
