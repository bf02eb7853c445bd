//! Fixture builders: minimal class files, jars and class directories.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
}

const MAJOR_VERSION: u16 = 52;

/// Builds class files (major version 52) without code attributes. Names use
/// the internal `/` form.
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    name: String,
    super_name: Option<String>,
    access: u16,
    interfaces: Vec<String>,
    fields: Vec<(u16, String, String)>,
    methods: Vec<(u16, String, String)>,
    signature: Option<String>,
    inner_classes: Vec<(String, Option<String>, Option<String>, u16)>,
}

impl ClassFileBuilder {
    /// Public class extending `java/lang/Object`
    pub fn class(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            access: access::PUBLIC | access::SUPER,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            signature: None,
            inner_classes: Vec::new(),
        }
    }

    pub fn interface(name: &str) -> Self {
        Self {
            access: access::PUBLIC | access::INTERFACE | access::ABSTRACT,
            ..Self::class(name)
        }
    }

    /// Class without a superclass, i.e. `java/lang/Object`
    pub fn root(name: &str) -> Self {
        Self {
            super_name: None,
            ..Self::class(name)
        }
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.access = flags;
        self
    }

    pub fn field(mut self, flags: u16, name: &str, descriptor: &str) -> Self {
        self.fields
            .push((flags, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn method(mut self, flags: u16, name: &str, descriptor: &str) -> Self {
        self.methods
            .push((flags, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn inner_class(
        mut self,
        inner: &str,
        outer: Option<&str>,
        simple_name: Option<&str>,
        flags: u16,
    ) -> Self {
        self.inner_classes.push((
            inner.to_string(),
            outer.map(str::to_string),
            simple_name.map(str::to_string),
            flags,
        ));
        self
    }

    /// Path of the class file inside an archive, e.g. `java/lang/String.class`
    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();

        let this_class = pool.class(&self.name);
        let super_class = self.super_name.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        let fields: Vec<[u16; 3]> = self
            .fields
            .iter()
            .map(|(flags, name, desc)| [*flags, pool.utf8(name), pool.utf8(desc)])
            .collect();
        let methods: Vec<[u16; 3]> = self
            .methods
            .iter()
            .map(|(flags, name, desc)| [*flags, pool.utf8(name), pool.utf8(desc)])
            .collect();

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(signature) = &self.signature {
            let name = pool.utf8("Signature");
            let value = pool.utf8(signature);
            attributes.push((name, value.to_be_bytes().to_vec()));
        }
        if !self.inner_classes.is_empty() {
            let name = pool.utf8("InnerClasses");
            let mut body = Vec::new();
            put_u16(&mut body, self.inner_classes.len() as u16);
            for (inner, outer, simple, flags) in &self.inner_classes {
                put_u16(&mut body, pool.class(inner));
                put_u16(&mut body, outer.as_deref().map(|o| pool.class(o)).unwrap_or(0));
                put_u16(&mut body, simple.as_deref().map(|s| pool.utf8(s)).unwrap_or(0));
                put_u16(&mut body, *flags);
            }
            attributes.push((name, body));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&[0xCA, 0xFE, 0xBA, 0xBE]);
        put_u16(&mut out, 0);
        put_u16(&mut out, MAJOR_VERSION);
        pool.write(&mut out);
        put_u16(&mut out, self.access);
        put_u16(&mut out, this_class);
        put_u16(&mut out, super_class);
        put_u16(&mut out, interfaces.len() as u16);
        for index in interfaces {
            put_u16(&mut out, index);
        }
        for members in [&fields, &methods] {
            put_u16(&mut out, members.len() as u16);
            for [flags, name, desc] in members {
                put_u16(&mut out, *flags);
                put_u16(&mut out, *name);
                put_u16(&mut out, *desc);
                put_u16(&mut out, 0);
            }
        }
        put_u16(&mut out, attributes.len() as u16);
        for (name, body) in attributes {
            put_u16(&mut out, name);
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
            out.extend_from_slice(&body);
        }
        out
    }
}

#[derive(Default)]
struct Pool {
    entries: Vec<Vec<u8>>,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Pool {
    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8.get(value) {
            return index;
        }
        let mut entry = vec![1];
        put_u16(&mut entry, value.len() as u16);
        entry.extend_from_slice(value.as_bytes());
        let index = self.push(entry);
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let mut entry = vec![7];
        put_u16(&mut entry, name_index);
        let index = self.push(entry);
        self.classes.insert(name.to_string(), index);
        index
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.entries.len() as u16 + 1);
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write a jar with the given `(entry name, bytes)` pairs
pub fn write_jar(path: &Path, entries: &[(String, Vec<u8>)]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options).map_err(io::Error::other)?;
        zip.write_all(bytes)?;
    }
    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

/// Write a jar containing the given classes
pub fn write_class_jar(path: &Path, classes: &[ClassFileBuilder]) -> io::Result<()> {
    let entries: Vec<(String, Vec<u8>)> =
        classes.iter().map(|c| (c.entry_name(), c.build())).collect();
    write_jar(path, &entries)
}

/// Write the classes as a class-file directory tree under `root`
pub fn write_class_dir(root: &Path, classes: &[ClassFileBuilder]) -> io::Result<()> {
    for class in classes {
        let path = root.join(class.entry_name());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, class.build())?;
    }
    Ok(())
}

/// `java.lang.Object`, `String`, `Cloneable`, `CharSequence`, `Comparable`,
/// `Runnable` and `java.io.Serializable` with their real hierarchy
pub fn platform_classes() -> Vec<ClassFileBuilder> {
    vec![
        ClassFileBuilder::root("java/lang/Object").method(access::PUBLIC, "<init>", "()V"),
        ClassFileBuilder::class("java/lang/String")
            .access(access::PUBLIC | access::FINAL | access::SUPER)
            .implements("java/io/Serializable")
            .implements("java/lang/Comparable")
            .implements("java/lang/CharSequence")
            .method(access::PUBLIC, "<init>", "()V")
            .method(access::PUBLIC, "length", "()I")
            .method(access::PUBLIC | access::STATIC, "valueOf", "(I)Ljava/lang/String;")
            .method(access::PUBLIC | access::STATIC, "valueOf", "(Z)Ljava/lang/String;"),
        ClassFileBuilder::interface("java/lang/Cloneable"),
        ClassFileBuilder::interface("java/lang/CharSequence"),
        ClassFileBuilder::interface("java/lang/Comparable")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;"),
        ClassFileBuilder::interface("java/lang/Runnable"),
        ClassFileBuilder::interface("java/io/Serializable"),
    ]
}
