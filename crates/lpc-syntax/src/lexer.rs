use logos::Logos;
use lpc_source::{LineIndex, Range};
use miette::SourceSpan;

/// A token with its source location. Trivia never reaches the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: SourceSpan,
    pub range: Range,
}

/// All tokens of the LPC dialect.
#[derive(Debug, Logos, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    /// A whole preprocessor line, continuations included.
    #[regex(r"#[ \t]*[A-Za-z_]+([^\n\\]|\\[^\n]|\\\n)*")]
    Directive,

    // Keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("foreach")]
    Foreach,
    #[token("in")]
    In,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("catch")]
    Catch,
    #[token("inherit")]
    Inherit,
    #[token("struct")]
    Struct,
    #[token("class")]
    Class,

    // Types
    #[token("int")]
    Int,
    #[token("float")]
    Float,
    #[token("string")]
    StringKw,
    #[token("object")]
    Object,
    #[token("mapping")]
    Mapping,
    #[token("mixed")]
    Mixed,
    #[token("void")]
    Void,
    #[token("status")]
    Status,
    #[token("function")]
    FunctionKw,
    #[token("closure")]
    ClosureKw,
    #[token("buffer")]
    Buffer,

    // Modifiers
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("static")]
    Static,
    #[token("nomask")]
    Nomask,
    #[token("varargs")]
    Varargs,
    #[token("nosave")]
    Nosave,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    FloatLit,
    #[regex(r"[0-9]+")]
    #[regex(r"0[xX][0-9a-fA-F]+")]
    IntLit,
    #[regex(r#""([^"\\\n]|\\.|\\\n)*""#)]
    StringLit,
    /// A string cut off by the end of its line.
    #[regex(r#""([^"\\\n]|\\.|\\\n)*"#)]
    UnterminatedString,
    #[regex(r"'([^'\\\n]|\\.)'")]
    CharLit,
    #[regex(r"\$[0-9]+")]
    ClosureArg,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // Compound brackets
    #[token("({")]
    ArrayOpen,
    #[token("([")]
    MappingOpen,
    #[token("(:")]
    ClosureOpen,
    #[token(":)")]
    ClosureClose,
    #[token("#'")]
    HashQuote,

    // Operators
    #[token("->")]
    Arrow,
    #[token("::")]
    ColonColon,
    #[token("...")]
    Ellipsis,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("^=")]
    CaretAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&&=")]
    AndAndAssign,
    #[token("||=")]
    OrOrAssign,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Trivia (to be skipped)
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    Trivia,

    /// A block comment running to the end of the input.
    #[regex(r"/\*([^*]|\*+[^*/])*\**")]
    UnterminatedComment,

    /// Never produced by the lexer; the parser reports it past the last token.
    Eof,

    // Catch-all for anything unexpected
    #[error]
    Error,
}

impl TokenKind {
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::StringKw
                | TokenKind::Object
                | TokenKind::Mapping
                | TokenKind::Mixed
                | TokenKind::Void
                | TokenKind::Status
                | TokenKind::FunctionKw
                | TokenKind::ClosureKw
                | TokenKind::Buffer
        )
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Public
                | TokenKind::Static
                | TokenKind::Nomask
                | TokenKind::Varargs
                | TokenKind::Nosave
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLit
                | TokenKind::FloatLit
                | TokenKind::StringLit
                | TokenKind::CharLit
                | TokenKind::ClosureArg
        )
    }

    pub fn is_assign_op(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
                | TokenKind::AmpAssign
                | TokenKind::PipeAssign
                | TokenKind::CaretAssign
                | TokenKind::ShlAssign
                | TokenKind::ShrAssign
                | TokenKind::AndAndAssign
                | TokenKind::OrOrAssign
        )
    }

    /// Fixed spelling of punctuation and operator tokens.
    pub fn fixed_text(self) -> Option<&'static str> {
        use TokenKind::*;
        let text = match self {
            ArrayOpen => "({",
            MappingOpen => "([",
            ClosureOpen => "(:",
            ClosureClose => ":)",
            HashQuote => "#'",
            Arrow => "->",
            ColonColon => "::",
            Ellipsis => "...",
            DotDot => "..",
            Dot => ".",
            PlusPlus => "++",
            MinusMinus => "--",
            PlusAssign => "+=",
            MinusAssign => "-=",
            StarAssign => "*=",
            SlashAssign => "/=",
            PercentAssign => "%=",
            AmpAssign => "&=",
            PipeAssign => "|=",
            CaretAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            AndAndAssign => "&&=",
            OrOrAssign => "||=",
            AndAnd => "&&",
            OrOr => "||",
            EqEq => "==",
            NotEq => "!=",
            Le => "<=",
            Ge => ">=",
            Shl => "<<",
            Shr => ">>",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            Bang => "!",
            Lt => "<",
            Gt => ">",
            Assign => "=",
            Question => "?",
            Colon => ":",
            Semi => ";",
            Comma => ",",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            _ => return None,
        };
        Some(text)
    }
}

/// Lex `text` into a token stream with line/column metadata.
pub fn tokenize(text: &str) -> Vec<Token> {
    let index = LineIndex::new(text);
    let mut lexer = TokenKind::lexer(text);
    let mut tokens: Vec<Token> = Vec::new();

    while let Some(kind) = lexer.next() {
        let span = lexer.span();

        // `(::foo()` lexes as `(:` `:foo`; split it back into `(` `::`.
        if kind == TokenKind::Colon {
            if let Some(prev) = tokens.last_mut() {
                let prev_end = prev.span.offset() + prev.span.len();
                if prev.kind == TokenKind::ClosureOpen && prev_end == span.start {
                    let paren_start = prev.span.offset();
                    prev.kind = TokenKind::LParen;
                    prev.text = "(".to_string();
                    prev.span = SourceSpan::from((paren_start, 1));
                    prev.range = index.range(text, prev.span);
                    let colons = SourceSpan::from((paren_start + 1, 2));
                    tokens.push(Token {
                        kind: TokenKind::ColonColon,
                        text: "::".to_string(),
                        span: colons,
                        range: index.range(text, colons),
                    });
                    continue;
                }
            }
        }

        let source_span = SourceSpan::from((span.start, span.end - span.start));
        tokens.push(Token {
            kind,
            text: lexer.slice().to_string(),
            span: source_span,
            range: index.range(text, source_span),
        });
    }

    tokens
}
