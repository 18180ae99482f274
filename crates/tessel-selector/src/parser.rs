//! Recursive-descent parser for selector expressions.

use tessel_core::ShapeKind;
use tracing::warn;

use crate::ast::{
    AttributeTest, Category, Comparator, Neighbor, ScopedAssertion, ScopedOperand, ScopedTest,
    Sequence, Stage,
};
use crate::error::{Result, SelectorError};
use crate::neighbor::RelationshipKind;

/// A parsed expression plus the `:root` sub-expressions it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub sequence: Sequence,
    pub roots: Vec<Sequence>,
}

pub fn parse(expression: &str) -> Result<Parsed> {
    let mut parser = Parser {
        input: expression,
        chars: expression.chars().collect(),
        pos: 0,
        roots: Vec::new(),
    };
    let sequence = parser.sequence()?;
    parser.ws();
    if !parser.eof() {
        return Err(parser.syntax(format!("unexpected `{}`", parser.peek())));
    }
    Ok(Parsed {
        sequence,
        roots: parser.roots,
    })
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    roots: Vec<Sequence>,
}

impl Parser<'_> {
    fn syntax(&self, message: impl Into<String>) -> SelectorError {
        SelectorError::Syntax {
            expression: self.input.to_string(),
            message: message.into(),
            position: self.pos,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn skip(&mut self) {
        self.pos += 1;
    }

    fn ws(&mut self) {
        while !self.eof() && self.peek().is_whitespace() {
            self.skip();
        }
    }

    fn expect(&mut self, expected: &[char]) -> Result<char> {
        let c = self.peek();
        if !self.eof() && expected.contains(&c) {
            self.skip();
            Ok(c)
        } else if self.eof() {
            Err(self.syntax(format!("expected one of {expected:?}, found end of input")))
        } else {
            Err(self.syntax(format!("expected one of {expected:?}, found `{c}`")))
        }
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    /// Stages until a `,`, `]`, `)`, or the end of input.
    fn sequence(&mut self) -> Result<Sequence> {
        let mut stages = Vec::new();
        self.ws();
        if let Some(stage) = self.stage()? {
            stages.push(stage);
        }
        self.ws();
        while !self.eof() && !matches!(self.peek(), ',' | ']' | ')') {
            if let Some(stage) = self.stage()? {
                stages.push(stage);
            }
            self.ws();
        }
        Ok(Sequence(stages))
    }

    /// One stage; `*` parses to nothing because it keeps every shape.
    fn stage(&mut self) -> Result<Option<Stage>> {
        self.ws();
        let stage = match self.peek() {
            ':' => {
                self.skip();
                self.function()?
            }
            '[' => {
                self.skip();
                if self.peek() == '@' {
                    self.skip();
                    self.scoped_attribute()?
                } else {
                    self.attribute()?
                }
            }
            '>' => {
                self.skip();
                Stage::Neighbor(Neighbor::Forward)
            }
            '<' => {
                self.skip();
                if self.peek() == '-' {
                    self.skip();
                    self.expect(&['['])?;
                    let rels = self.relationships()?;
                    self.expect(&['-'])?;
                    Stage::Neighbor(Neighbor::ReverseDirected(rels))
                } else {
                    Stage::Neighbor(Neighbor::Reverse)
                }
            }
            '~' => {
                self.skip();
                self.expect(&['>'])?;
                Stage::Neighbor(Neighbor::Recursive)
            }
            '-' => {
                self.skip();
                self.expect(&['['])?;
                let rels = self.relationships()?;
                self.expect(&['-'])?;
                self.expect(&['>'])?;
                Stage::Neighbor(Neighbor::ForwardDirected(rels))
            }
            '*' => {
                self.skip();
                return Ok(None);
            }
            '$' => {
                self.skip();
                self.variable()?
            }
            c if is_identifier_start(c) => {
                let ident = self.identifier()?;
                match ident.as_str() {
                    "number" => Stage::Category(Category::Number),
                    "simpleType" => Stage::Category(Category::SimpleType),
                    "collection" => Stage::Category(Category::Collection),
                    other => match other.parse::<ShapeKind>() {
                        Ok(kind) => Stage::Kind(kind),
                        Err(_) => return Err(self.syntax(format!("unknown shape type `{other}`"))),
                    },
                }
            }
            _ if self.eof() => return Err(self.syntax("unexpected end of selector")),
            c => return Err(self.syntax(format!("unexpected selector character `{c}`"))),
        };
        Ok(Some(stage))
    }

    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        if !is_identifier_start(self.peek()) {
            return Err(self.syntax("expected an identifier"));
        }
        while !self.eof() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            self.skip();
        }
        Ok(self.slice(start))
    }

    fn variable(&mut self) -> Result<Stage> {
        self.ws();
        if self.peek() == '{' {
            self.skip();
            self.ws();
            let name = self.identifier()?;
            self.ws();
            self.expect(&['}'])?;
            return Ok(Stage::GetVariable(name));
        }
        let name = self.identifier()?;
        self.ws();
        self.expect(&['('])?;
        let inner = self.sequence()?;
        self.ws();
        self.expect(&[')'])?;
        Ok(Stage::StoreVariable(name, inner))
    }

    fn relationships(&mut self) -> Result<Vec<String>> {
        let mut rels = Vec::new();
        loop {
            self.ws();
            let name = self.identifier()?;
            if !RelationshipKind::is_known_label(&name) {
                warn!(relationship = %name, selector = self.input, "unknown relationship type in selector");
            }
            rels.push(name);
            self.ws();
            if self.expect(&[']', ','])? == ']' {
                return Ok(rels);
            }
        }
    }

    fn function(&mut self) -> Result<Stage> {
        let start = self.pos;
        let name = self.identifier()?;
        let mut args = self.function_args()?;
        Ok(match name.as_str() {
            "not" => Stage::Not(self.single_arg(&name, start, &mut args)?),
            "test" => Stage::Test(args),
            "is" => Stage::Is(args),
            "in" => Stage::In(self.single_arg(&name, start, &mut args)?),
            "root" => {
                let inner = self.single_arg(&name, start, &mut args)?;
                self.roots.push(inner);
                Stage::Root(self.roots.len() - 1)
            }
            "recursive" => Stage::Recursive(self.single_arg(&name, start, &mut args)?),
            "topdown" => {
                if args.len() > 2 {
                    return Err(SelectorError::Syntax {
                        expression: self.input.to_string(),
                        message: format!(
                            "the :topdown function accepts 1 or 2 selectors, but found {}",
                            args.len()
                        ),
                        position: start,
                    });
                }
                let mut args = args.into_iter();
                let qualifier = args.next().unwrap_or_default();
                Stage::TopDown(qualifier, args.next())
            }
            other => {
                warn!(function = other, selector = self.input, "unknown selector function");
                Stage::Unknown(other.to_string())
            }
        })
    }

    fn single_arg(&self, name: &str, start: usize, args: &mut Vec<Sequence>) -> Result<Sequence> {
        if args.len() == 1 {
            Ok(args.remove(0))
        } else {
            Err(SelectorError::Syntax {
                expression: self.input.to_string(),
                message: format!("the :{name} function requires a single selector argument"),
                position: start,
            })
        }
    }

    fn function_args(&mut self) -> Result<Vec<Sequence>> {
        self.ws();
        self.expect(&['('])?;
        let mut args = Vec::new();
        loop {
            args.push(self.sequence()?);
            self.ws();
            if self.expect(&[')', ','])? == ')' {
                return Ok(args);
            }
        }
    }

    fn attribute(&mut self) -> Result<Stage> {
        self.ws();
        let path = self.attribute_path()?;
        self.ws();
        let next = self.expect(&[']', '=', '!', '^', '$', '*', '?', '>', '<', '{'])?;
        if next == ']' {
            return Ok(Stage::Attribute(AttributeTest {
                path,
                comparison: None,
            }));
        }

        let comparator = self.comparator(next)?;
        let mut values = vec![self.value()?];
        self.ws();
        while self.peek() == ',' {
            self.skip();
            values.push(self.value()?);
            self.ws();
        }
        let insensitive = self.case_insensitive();
        self.expect(&[']'])?;
        Ok(Stage::Attribute(AttributeTest {
            path,
            comparison: Some((comparator, values, insensitive)),
        }))
    }

    fn case_insensitive(&mut self) -> bool {
        self.ws();
        let insensitive = self.peek() == 'i';
        if insensitive {
            self.skip();
            self.ws();
        }
        insensitive
    }

    fn comparator(&mut self, first: char) -> Result<Comparator> {
        let comparator = match first {
            '=' => Comparator::Equals,
            '!' => {
                self.expect(&['='])?;
                Comparator::NotEquals
            }
            '^' => {
                self.expect(&['='])?;
                Comparator::StartsWith
            }
            '$' => {
                self.expect(&['='])?;
                Comparator::EndsWith
            }
            '*' => {
                self.expect(&['='])?;
                Comparator::Contains
            }
            '?' => {
                self.expect(&['='])?;
                Comparator::Exists
            }
            '>' if self.peek() == '=' => {
                self.skip();
                Comparator::GreaterThanOrEqual
            }
            '>' => Comparator::GreaterThan,
            '<' if self.peek() == '=' => {
                self.skip();
                Comparator::LessThanOrEqual
            }
            '<' => Comparator::LessThan,
            '{' => {
                let comparator = match self.expect(&['<', '=', '!'])? {
                    '<' if self.peek() == '<' => {
                        self.skip();
                        Comparator::ProperSubset
                    }
                    '<' => Comparator::Subset,
                    '=' => Comparator::ProjectionEquals,
                    _ => {
                        self.expect(&['='])?;
                        Comparator::ProjectionNotEquals
                    }
                };
                self.expect(&['}'])?;
                comparator
            }
            other => return Err(self.syntax(format!("unknown attribute comparator `{other}`"))),
        };
        self.ws();
        Ok(comparator)
    }

    fn attribute_path(&mut self) -> Result<Vec<String>> {
        self.ws();
        // `[@:` scopes to the current shape.
        if self.peek() == ':' {
            return Ok(Vec::new());
        }
        let mut path = vec![self.identifier()?];
        path.extend(self.path_segments()?);
        Ok(path)
    }

    fn path_segments(&mut self) -> Result<Vec<String>> {
        self.ws();
        let mut segments = Vec::new();
        while self.peek() == '|' {
            self.skip();
            segments.push(self.path_segment()?);
        }
        Ok(segments)
    }

    fn path_segment(&mut self) -> Result<String> {
        self.ws();
        if self.peek() == '(' {
            self.skip();
            let name = self.identifier()?;
            self.expect(&[')'])?;
            return Ok(format!("({name})"));
        }
        self.value()
    }

    /// A quoted string, a number, or a bare shape id.
    fn value(&mut self) -> Result<String> {
        self.ws();
        match self.peek() {
            quote @ ('\'' | '"') => {
                self.skip();
                let start = self.pos;
                while !self.eof() && self.peek() != quote {
                    self.skip();
                }
                if self.eof() {
                    return Err(self.syntax(format!("expected {quote} to close {}", self.slice(start))));
                }
                let value = self.slice(start);
                self.skip();
                self.ws();
                Ok(value)
            }
            c if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                self.skip();
                while !self.eof()
                    && (self.peek().is_ascii_digit() || matches!(self.peek(), '.' | 'e' | 'E' | '+' | '-'))
                {
                    self.skip();
                }
                let text = self.slice(start);
                if text.parse::<f64>().is_err() {
                    return Err(self.syntax(format!("invalid number `{text}`")));
                }
                Ok(text)
            }
            c if is_identifier_start(c) => {
                let start = self.pos;
                while !self.eof()
                    && (self.peek().is_ascii_alphanumeric() || matches!(self.peek(), '_' | '.' | '#' | '$'))
                {
                    self.skip();
                }
                Ok(self.slice(start))
            }
            _ if self.eof() => Err(self.syntax("expected a value, found end of input")),
            c => Err(self.syntax(format!("expected a value, found `{c}`"))),
        }
    }

    fn scoped_attribute(&mut self) -> Result<Stage> {
        self.ws();
        let path = self.attribute_path()?;
        self.ws();
        self.expect(&[':'])?;
        self.ws();

        let mut assertions = vec![self.scoped_assertion()?];
        self.ws();
        while self.peek() == '&' {
            self.expect(&['&'])?;
            self.expect(&['&'])?;
            self.ws();
            assertions.push(self.scoped_assertion()?);
            self.ws();
        }
        self.expect(&[']'])?;
        Ok(Stage::Scoped(ScopedTest { path, assertions }))
    }

    fn scoped_assertion(&mut self) -> Result<ScopedAssertion> {
        let lhs = self.scoped_operand()?;
        let first = self.expect(&['=', '!', '^', '$', '*', '?', '>', '<', '{'])?;
        let comparator = self.comparator(first)?;
        let mut rhs = vec![self.scoped_operand()?];
        while self.peek() == ',' {
            self.skip();
            rhs.push(self.scoped_operand()?);
        }
        let case_insensitive = self.case_insensitive();
        Ok(ScopedAssertion {
            lhs,
            comparator,
            rhs,
            case_insensitive,
        })
    }

    fn scoped_operand(&mut self) -> Result<ScopedOperand> {
        self.ws();
        let operand = if self.peek() == '@' && self.peek_at(1) == '{' {
            self.skip();
            self.skip();
            let mut path = vec![self.path_segment()?];
            path.extend(self.path_segments()?);
            self.expect(&['}'])?;
            ScopedOperand::Path(path)
        } else {
            ScopedOperand::Literal(self.value()?)
        };
        self.ws();
        Ok(operand)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(expr: &str) -> Vec<Stage> {
        parse(expr).unwrap().sequence.0
    }

    #[test]
    fn parses_types_and_neighbors() {
        assert_eq!(
            stages("structure > member"),
            vec![
                Stage::Kind(ShapeKind::Structure),
                Stage::Neighbor(Neighbor::Forward),
                Stage::Kind(ShapeKind::Member),
            ]
        );
        assert_eq!(
            stages("operation -[input, output]-> structure"),
            vec![
                Stage::Kind(ShapeKind::Operation),
                Stage::Neighbor(Neighbor::ForwardDirected(vec!["input".into(), "output".into()])),
                Stage::Kind(ShapeKind::Structure),
            ]
        );
        assert_eq!(
            stages("member <-[member]- ~>"),
            vec![
                Stage::Kind(ShapeKind::Member),
                Stage::Neighbor(Neighbor::ReverseDirected(vec!["member".into()])),
                Stage::Neighbor(Neighbor::Recursive),
            ]
        );
        assert!(stages("*").is_empty());
    }

    #[test]
    fn parses_attributes() {
        assert_eq!(
            stages("[trait|required]"),
            vec![Stage::Attribute(AttributeTest {
                path: vec!["trait".into(), "required".into()],
                comparison: None,
            })]
        );
        assert_eq!(
            stages("[id|namespace ^= 'smithy.', \"aws.\" i]"),
            vec![Stage::Attribute(AttributeTest {
                path: vec!["id".into(), "namespace".into()],
                comparison: Some((
                    Comparator::StartsWith,
                    vec!["smithy.".into(), "aws.".into()],
                    true
                )),
            })]
        );
        assert_eq!(
            stages("[id = smithy.example#Foo$bar]"),
            vec![Stage::Attribute(AttributeTest {
                path: vec!["id".into()],
                comparison: Some((Comparator::Equals, vec!["smithy.example#Foo$bar".into()], false)),
            })]
        );
        assert_eq!(
            stages("[trait|range|min >= -1.5]"),
            vec![Stage::Attribute(AttributeTest {
                path: vec!["trait".into(), "range".into(), "min".into()],
                comparison: Some((Comparator::GreaterThanOrEqual, vec!["-1.5".into()], false)),
            })]
        );
    }

    #[test]
    fn parses_scoped_attributes() {
        let parsed = stages("[@trait|tags|(values): @{(length)} > 3 && @{(length)} {!=} @{(values)}]");
        let Stage::Scoped(scoped) = &parsed[0] else {
            panic!("expected a scoped attribute");
        };
        assert_eq!(scoped.path, vec!["trait", "tags", "(values)"]);
        assert_eq!(scoped.assertions.len(), 2);
        assert_eq!(scoped.assertions[1].comparator, Comparator::ProjectionNotEquals);

        let current = stages("[@: @{id|name} = Foo]");
        let Stage::Scoped(scoped) = &current[0] else {
            panic!("expected a scoped attribute");
        };
        assert!(scoped.path.is_empty());
    }

    #[test]
    fn parses_functions_and_variables() {
        let parsed = parse("$ops(operation) :root(service) :not(member) :topdown([trait|a], [trait|b]) ${ops}").unwrap();
        assert_eq!(parsed.roots, vec![Sequence(vec![Stage::Kind(ShapeKind::Service)])]);
        assert!(matches!(parsed.sequence.0[0], Stage::StoreVariable(ref n, _) if n == "ops"));
        assert_eq!(parsed.sequence.0[1], Stage::Root(0));
        assert!(matches!(parsed.sequence.0[3], Stage::TopDown(_, Some(_))));
        assert_eq!(parsed.sequence.0[4], Stage::GetVariable("ops".into()));
    }

    #[test]
    fn unknown_functions_and_relationships_are_tolerated() {
        assert_eq!(stages(":futureThing(string)"), vec![Stage::Unknown("futureThing".into())]);
        assert!(parse("-[notARelationship]-> *").is_ok());
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = parse("structure >> foo").unwrap_err();
        let SelectorError::Syntax { position, .. } = err;
        assert_eq!(position, 16);
        assert!(parse("[id = 'open").is_err());
        assert!(parse(":not(string, number)").is_err());
        assert!(parse("").is_err());
    }
}
