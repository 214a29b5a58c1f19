use crate::domain::models::Role;
use crate::domain::ports::Renderer;
use crate::domain::session::Transcript;
use std::io::{self, Stdout, Write};

/// Line-oriented chat rendering. A streamed segment is printed incrementally:
/// each redraw writes only the part of the segment not yet on screen.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    shown: usize,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, shown: 0 }
    }

    pub fn prompt(&mut self, placeholder: &str) {
        self.emit(format_args!("{} > ", placeholder));
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn label(role: Role) -> &'static str {
        match role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        // A closed stdout leaves nothing useful to do with the error
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, "terminal write failed");
        }
    }

    fn write_unseen(&mut self, segment: &str) {
        if segment.len() < self.shown || !segment.is_char_boundary(self.shown) {
            // Segment was replaced rather than extended; start a fresh line
            self.emit(format_args!("\n{}: {}", Self::label(Role::Assistant), segment));
        } else if self.shown == 0 {
            self.emit(format_args!("{}: {}", Self::label(Role::Assistant), segment));
        } else {
            let tail = &segment[self.shown..];
            self.emit(format_args!("{}", tail));
        }
        self.shown = segment.len();
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render_title(&mut self, title: &str) {
        self.emit(format_args!("{}\n{}\n\n", title, "=".repeat(title.chars().count())));
    }

    fn render_transcript(&mut self, transcript: &Transcript) {
        for entry in transcript.entries() {
            self.emit(format_args!("{}: {}\n", Self::label(entry.role), entry.content));
        }
    }

    fn render_user(&mut self, content: &str) {
        self.emit(format_args!("{}: {}\n", Self::label(Role::User), content));
    }

    fn render_partial(&mut self, segment: &str) {
        self.write_unseen(segment);
    }

    fn render_final(&mut self, content: &str) {
        if self.shown == 0 {
            self.emit(format_args!("{}: {}\n", Self::label(Role::Assistant), content));
        } else {
            self.write_unseen(content);
            self.emit(format_args!("\n"));
        }
        self.shown = 0;
    }

    fn render_error(&mut self, message: &str) {
        if self.shown > 0 {
            self.emit(format_args!("\n"));
            self.shown = 0;
        }
        self.emit(format_args!("[error] {}\n", message));
    }
}
