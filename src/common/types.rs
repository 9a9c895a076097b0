use std::fmt;

/// Base (non-pointer) types of the language
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Char,
    UChar,
    Int,
    UInt,
    Long,
    ULong,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BaseType::Void => "void",
            BaseType::Char => "char",
            BaseType::UChar => "unsigned char",
            BaseType::Int => "int",
            BaseType::UInt => "unsigned int",
            BaseType::Long => "long",
            BaseType::ULong => "unsigned long",
        };
        write!(f, "{}", name)
    }
}

/// A resolved type: base type plus pointer depth (`int**` has depth 2)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub base: BaseType,
    pub pointer_depth: u32,
}

impl Type {
    /// Widest integer type; default for compiler temporaries
    pub const LONG: Type = Type::scalar(BaseType::Long);
    pub const INT: Type = Type::scalar(BaseType::Int);
    pub const CHAR: Type = Type::scalar(BaseType::Char);
    pub const VOID: Type = Type::scalar(BaseType::Void);

    pub const fn scalar(base: BaseType) -> Self {
        Self {
            base,
            pointer_depth: 0,
        }
    }

    pub const fn pointer_to(self) -> Self {
        Self {
            base: self.base,
            pointer_depth: self.pointer_depth + 1,
        }
    }

    pub fn is_void(&self) -> bool {
        self.base == BaseType::Void && self.pointer_depth == 0
    }
}

impl Default for Type {
    fn default() -> Self {
        Type::LONG
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for _ in 0..self.pointer_depth {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// Where a variable lives, resolved by the front end
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageClass {
    /// Static storage, addressed by symbol
    Global,
    /// Function parameter, lives in the current frame
    Param,
    /// Local variable or compiler temporary, lives in the current frame
    Local,
}

impl StorageClass {
    pub fn is_global(self) -> bool {
        self == StorageClass::Global
    }

    /// Short tag used when rendering variable names
    pub fn tag(self) -> char {
        match self {
            StorageClass::Global => 'g',
            StorageClass::Param => 'p',
            StorageClass::Local => 'l',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::INT.to_string(), "int");
        assert_eq!(Type::CHAR.pointer_to().pointer_to().to_string(), "char**");
        assert_eq!(
            Type::scalar(BaseType::ULong).to_string(),
            "unsigned long"
        );
    }

    #[test]
    fn test_void_pointer_is_not_void() {
        assert!(Type::VOID.is_void());
        assert!(!Type::VOID.pointer_to().is_void());
        assert_eq!(Type::VOID.pointer_to().pointer_depth, 1);
    }
}
