//! TeX tokens and category codes.

mod catcode;
pub mod lexer;
pub mod trace;
pub use catcode::CatCode;

/// Interned name of a control sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsName(lasso::Spur);

/// String interner for control sequence names.
#[derive(Debug, Default)]
pub struct CsNameInterner(lasso::Rodeo);

impl CsNameInterner {
    pub fn get_or_intern(&mut self, name: &str) -> CsName {
        CsName(self.0.get_or_intern(name))
    }

    /// Returns the interned name, if it has been interned.
    pub fn get(&self, name: &str) -> Option<CsName> {
        self.0.get(name).map(CsName)
    }

    pub fn resolve(&self, cs_name: CsName) -> &str {
        self.0.resolve(&cs_name.0)
    }
}

/// The value of a token.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    BeginGroup(char),
    EndGroup(char),
    MathShift(char),
    AlignmentTab(char),
    Parameter(char),
    Superscript(char),
    Subscript(char),
    Space(char),
    Letter(char),
    Other(char),
    CommandRef(CommandRef),
}

/// What a command token refers to in the macro table.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandRef {
    ControlSequence(CsName),
    ActiveCharacter(char),
}

impl CommandRef {
    pub fn to_string(&self, interner: &CsNameInterner) -> String {
        match self {
            CommandRef::ControlSequence(name) => format!("\\{}", interner.resolve(*name)),
            CommandRef::ActiveCharacter(c) => c.to_string(),
        }
    }
}

impl Value {
    /// Builds the value of a character token.
    ///
    /// Returns [None] for the category codes that never leave the lexer.
    pub fn new(c: char, cat_code: CatCode) -> Option<Value> {
        Some(match cat_code {
            CatCode::BeginGroup => Value::BeginGroup(c),
            CatCode::EndGroup => Value::EndGroup(c),
            CatCode::MathShift => Value::MathShift(c),
            CatCode::AlignmentTab => Value::AlignmentTab(c),
            CatCode::Parameter => Value::Parameter(c),
            CatCode::Superscript => Value::Superscript(c),
            CatCode::Subscript => Value::Subscript(c),
            CatCode::Space => Value::Space(c),
            CatCode::Letter => Value::Letter(c),
            CatCode::Other => Value::Other(c),
            CatCode::Active => Value::CommandRef(CommandRef::ActiveCharacter(c)),
            _ => return None,
        })
    }

    /// The character and category code of a character token, the inverse of [Value::new].
    ///
    /// Control sequences have neither.
    pub fn parts(self) -> Option<(char, CatCode)> {
        let (c, cat_code) = match self {
            Value::BeginGroup(c) => (c, CatCode::BeginGroup),
            Value::EndGroup(c) => (c, CatCode::EndGroup),
            Value::MathShift(c) => (c, CatCode::MathShift),
            Value::AlignmentTab(c) => (c, CatCode::AlignmentTab),
            Value::Parameter(c) => (c, CatCode::Parameter),
            Value::Superscript(c) => (c, CatCode::Superscript),
            Value::Subscript(c) => (c, CatCode::Subscript),
            Value::Space(c) => (c, CatCode::Space),
            Value::Letter(c) => (c, CatCode::Letter),
            Value::Other(c) => (c, CatCode::Other),
            Value::CommandRef(CommandRef::ActiveCharacter(c)) => (c, CatCode::Active),
            Value::CommandRef(CommandRef::ControlSequence(_)) => return None,
        };
        Some((c, cat_code))
    }
}

/// A token together with the trace key of where it was read.
///
/// Equality and hashing look at the value only.
#[derive(Debug, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    value: Value,
    trace_key: trace::Key,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Token {
    pub fn new(value: Value, trace_key: trace::Key) -> Token {
        Token { value, trace_key }
    }

    pub fn new_control_sequence(name: CsName, trace_key: trace::Key) -> Token {
        Token::new(
            Value::CommandRef(CommandRef::ControlSequence(name)),
            trace_key,
        )
    }

    pub fn new_space(c: char, trace_key: trace::Key) -> Token {
        Token::new(Value::Space(c), trace_key)
    }

    pub fn new_other(c: char, trace_key: trace::Key) -> Token {
        Token::new(Value::Other(c), trace_key)
    }

    pub fn new_letter(c: char, trace_key: trace::Key) -> Token {
        Token::new(Value::Letter(c), trace_key)
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn trace_key(&self) -> trace::Key {
        self.trace_key
    }

    pub fn char(&self) -> Option<char> {
        self.value.parts().map(|(c, _)| c)
    }

    pub fn cat_code(&self) -> Option<CatCode> {
        self.value.parts().map(|(_, cat_code)| cat_code)
    }

    pub fn command_ref(&self) -> Option<CommandRef> {
        match self.value {
            Value::CommandRef(command_ref) => Some(command_ref),
            _ => None,
        }
    }
}

/// Writes a list of tokens the way TeX prints them.
///
/// Control words are followed by a space, unless they are the last token.
pub fn write_tokens<'a, T>(tokens: T, interner: &CsNameInterner) -> String
where
    T: IntoIterator<Item = &'a Token>,
{
    write_token_values(tokens.into_iter().map(Token::value), interner)
}

pub fn write_token_values<T>(values: T, interner: &CsNameInterner) -> String
where
    T: IntoIterator<Item = Value>,
{
    let mut result = String::default();
    let mut pending_space = false;
    for value in values {
        if pending_space {
            result.push(' ');
            pending_space = false;
        }
        match value {
            Value::CommandRef(CommandRef::ControlSequence(name)) => {
                let name = interner.resolve(name);
                result.push('\\');
                result.push_str(name);
                pending_space = name.chars().all(char::is_alphabetic) && !name.is_empty();
            }
            other => result.extend(other.parts().map(|(c, _)| c)),
        }
    }
    result
}
