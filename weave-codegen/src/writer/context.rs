/// How declaration texts are printed in the part of the unit being written.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Declarations are copied as written.
    #[default]
    Plain,
    /// Spreads point to the `.raw` accessor of the child.
    Raw,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub indent: u32,
    pub section: Section,
}

impl Context {
    pub fn new(section: Section) -> Self {
        Self { indent: 0, section }
    }

    /// One level deeper, same section.
    pub fn nested(&self) -> Self {
        Self {
            indent: self.indent + 1,
            ..*self
        }
    }

    pub fn switch_section(&self, section: Section) -> Self {
        Self { section, ..*self }
    }
}
