use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent, Stylize},
    QueueableCommand,
};

use std::io::{stdout, Write};

use thermal_connect4::{Cell, GameState};

/// Draws the board to stdout in colour, or as plain text when `plain` is set
pub fn display(state: &GameState, plain: bool) -> Result<()> {
    let mut stdout = stdout();
    render(&mut stdout, state, plain)?;
    stdout.flush()?;
    Ok(())
}

fn render<W: Write>(out: &mut W, state: &GameState, plain: bool) -> Result<()> {
    if plain {
        writeln!(out, "{}", state)?;
        return Ok(());
    }

    let board = state.board();
    for row in 0..board.rows() {
        for column in 0..board.columns() {
            let mut piece = style("O ")
                .attribute(Attribute::Bold)
                .on(Color::DarkBlue)
                .with(match board.get(row, column) {
                    Cell::PlayerOne => Color::Red,
                    Cell::PlayerTwo => Color::Yellow,
                    Cell::Empty => Color::DarkBlue,
                });
            if state.last_move() == Some((row, column)) {
                piece = piece.attribute(Attribute::Underlined);
            }
            out.queue(PrintStyledContent(piece))?;
        }
        out.queue(PrintStyledContent(style("\n")))?;
    }

    let legend: Vec<String> = (0..board.columns()).map(|column| column.to_string()).collect();
    out.queue(PrintStyledContent(style(legend.join(" ") + "\n")))?;
    Ok(())
}
