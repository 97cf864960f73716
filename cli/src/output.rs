use colored::*;
use pulldown_cmark::{Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};
use resume_chat_core::{ImageStatus, ProfileAssets, Role, Turn};

/// Print the sidebar block: name, picture status and CV link
pub fn print_sidebar(assets: &ProfileAssets, image: &ImageStatus) {
    println!("{}", "─".repeat(48).dimmed());
    println!("{}", assets.name.bold());

    match image {
        ImageStatus::Loaded {
            bytes,
            content_type,
        } => println!(
            "  {} {} ({} bytes)",
            "Photo:".cyan(),
            content_type.as_deref().unwrap_or("image"),
            bytes
        ),
        ImageStatus::Missing => {}
        ImageStatus::Failed(reason) => print_inline_error(&format!("Could not load the image: {}", reason)),
    }

    if let Some(cv_url) = assets.download_link() {
        println!("  {} {}", "Download CV:".cyan(), cv_url.underline());
    }
    println!("{}", "─".repeat(48).dimmed());
    println!();
}

/// Title and description, shown before the first question only
pub fn print_header(name: &str, tagline: &str) {
    println!("{}", format!("# {}", name).bright_cyan().bold());
    println!("{}", tagline);
    println!("Type 'exit' or 'quit' to end the session.");
    println!();
}

/// Print one transcript entry
pub fn print_turn(turn: &Turn) {
    match turn.role() {
        Role::User => println!("{}: {}", "You".green().bold(), turn.content()),
        Role::Assistant => println!(
            "{}: {}",
            "Assistant".blue().bold(),
            render_markdown(turn.content()).trim_end()
        ),
    }
}

/// Non-fatal problem, shown inline
pub fn print_inline_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message.red());
}

/// Fatal to the session
pub fn print_blocking_error(message: &str) {
    eprintln!();
    eprintln!("{}", message.on_red().white().bold());
    eprintln!();
}

/// Render markdown for the terminal
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = MdParser::new_ext(markdown, options);

    let mut output = String::new();
    let mut strong = 0usize;
    let mut emphasis = 0usize;
    let mut in_code_block = false;
    let mut list_depth = 0usize;
    // destination of each open link, innermost last
    let mut links: Vec<(String, String)> = Vec::new();

    for event in parser {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                output.push('\n');
                let marker = match level {
                    HeadingLevel::H1 => "#",
                    HeadingLevel::H2 => "##",
                    _ => "###",
                };
                output.push_str(&format!("{} ", marker.bright_cyan().bold()));
                strong += 1;
            }
            MdEvent::End(Tag::Heading(..)) => {
                strong = strong.saturating_sub(1);
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if list_depth == 0 && !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                if list_depth == 0 {
                    output.push_str("\n\n");
                }
            }
            MdEvent::Start(Tag::List(_)) => {
                if list_depth == 0 && !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                list_depth += 1;
            }
            MdEvent::End(Tag::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::Item) => {
                output.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                output.push_str(&format!("{}  ", "•".yellow()));
            }
            MdEvent::End(Tag::Item) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
                output.push('\n');
            }
            MdEvent::Start(Tag::Strong) => strong += 1,
            MdEvent::End(Tag::Strong) => strong = strong.saturating_sub(1),
            MdEvent::Start(Tag::Emphasis) => emphasis += 1,
            MdEvent::End(Tag::Emphasis) => emphasis = emphasis.saturating_sub(1),
            MdEvent::Start(Tag::Link(_, destination, _)) => {
                links.push((destination.to_string(), String::new()));
            }
            MdEvent::End(Tag::Link(..)) => {
                if let Some((destination, text)) = links.pop() {
                    // Link targets are printed raw so underscores survive
                    if text != destination {
                        output.push_str(&format!(" ({})", destination.underline()));
                    }
                }
            }
            MdEvent::Code(ref code) => {
                output.push_str(&code.on_bright_black().white().to_string());
            }
            MdEvent::Text(ref text) => {
                if let Some((_, link_text)) = links.last_mut() {
                    link_text.push_str(text);
                }

                if in_code_block {
                    output.push_str(&text.dimmed().to_string());
                } else {
                    output.push_str(&style_text(text, strong > 0, emphasis > 0, !links.is_empty()));
                }
            }
            MdEvent::Html(ref html) => output.push_str(html),
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            MdEvent::Rule => {
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            _ => {}
        }
    }

    output
}

fn style_text(text: &str, strong: bool, emphasis: bool, link: bool) -> String {
    let mut styled = text.normal();
    if strong {
        styled = styled.bold();
    }
    if emphasis {
        styled = styled.italic();
    }
    if link {
        styled = styled.underline();
    }
    styled.to_string()
}
