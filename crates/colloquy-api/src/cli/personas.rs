//! `colloquy personas`: list the persona catalog.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use colloquy_core::chat::persona::PersonaProvider;
use colloquy_types::persona::{ColorToken, Persona};

use crate::state::AppState;

fn table_color(color: ColorToken) -> Color {
    match color {
        ColorToken::Black => Color::Black,
        ColorToken::Red => Color::Red,
        ColorToken::Green => Color::Green,
        ColorToken::Yellow => Color::Yellow,
        ColorToken::Blue => Color::Blue,
        ColorToken::Magenta => Color::Magenta,
        ColorToken::Cyan => Color::Cyan,
        ColorToken::White => Color::White,
        ColorToken::Dim => Color::DarkGrey,
    }
}

fn summarize(prompt: &str) -> String {
    let first = prompt.split_terminator(['.', '\n']).next().unwrap_or("").trim();
    if first.chars().count() > 60 {
        let cut: String = first.chars().take(57).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

pub fn list_personas(state: &AppState, json: bool) -> Result<()> {
    let personas: Vec<Persona> = state.personas.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&personas)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Persona").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Character").fg(Color::White),
    ]);

    for persona in &personas {
        table.add_row(vec![
            Cell::new(persona.label()).fg(table_color(persona.label_color)),
            Cell::new(&persona.name).fg(Color::White),
            Cell::new(summarize(&persona.system_prompt)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} persona{} · add your own in {}",
        style(personas.len()).bold(),
        if personas.len() == 1 { "" } else { "s" },
        style(state.data_dir.join("personas.toml").display()).yellow()
    );
    println!();

    Ok(())
}
