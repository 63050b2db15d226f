use similar_asserts::assert_eq;
use trackable_compiler_backend::{
    AccessFlags, ClassFile, CodegenExtension, EmitError, Instr, TrackableCodegenExtension,
    ACCESSOR_DESCRIPTOR, OBJECT,
};
use trackable_compiler_frontend::constants::annotation;
use trackable_compiler_frontend::{
    Annotation, Configuration, DeclId, Declaration, DeclarationShape, Member, MemberFlags,
    MemberSynthesizer, Message, Reporter, Symbols,
};

fn resolve(symbols: &mut Symbols, decl: Declaration) -> DeclId {
    let id = symbols.add_declaration(decl).unwrap();
    let mut reporter = Reporter::<Message>::default();
    MemberSynthesizer::new(Configuration::default()).synthesize(symbols, id, &mut reporter);
    id
}

fn generate(symbols: &Symbols, id: DeclId, class: &mut ClassFile) -> Result<(), EmitError> {
    TrackableCodegenExtension::new(Configuration::default()).generate_class_syntax(
        symbols,
        id,
        class,
    )
}

fn class_file(symbols: &Symbols, id: DeclId) -> ClassFile {
    let decl = &symbols[id];
    let mut access = AccessFlags::new().with_is_public(true);
    if decl.shape().is_interface() {
        access = access.with_is_interface(true).with_is_abstract(true);
    } else {
        access = access.with_is_super(true);
    }
    ClassFile::new(&decl.name().internal_name(), OBJECT, access).unwrap()
}

#[test]
fn final_class_accessor() {
    let mut symbols = Symbols::default();
    let id = resolve(
        &mut symbols,
        Declaration::new("com.example.A", DeclarationShape::Class)
            .with_annotation(Annotation::new(annotation::TRACKABLE)),
    );
    let mut class = class_file(&symbols, id);
    generate(&symbols, id, &mut class).unwrap();

    let bytes = class.to_bytes().unwrap();
    let read = ClassFile::from_bytes(&bytes).unwrap();
    assert_eq!(
        read.to_string(),
        "\
public class com/example/A extends java/lang/Object
  public final track()Ljava/lang/String;
    stack=1, locals=1
    ldc #6 // String A
    areturn"
    );
}

#[test]
fn interface_accessor_is_abstract() {
    let mut symbols = Symbols::default();
    let id = resolve(
        &mut symbols,
        Declaration::new("a.Event", DeclarationShape::Interface)
            .with_annotation(Annotation::new(annotation::TRACKABLE)),
    );
    let mut class = class_file(&symbols, id);
    generate(&symbols, id, &mut class).unwrap();

    assert_eq!(
        class.to_string(),
        "\
public interface a/Event extends java/lang/Object
  public abstract track()Ljava/lang/String;"
    );
    let method = class.method("track", ACCESSOR_DESCRIPTOR).unwrap();
    assert!(method.code().is_none());
    assert_eq!(method.access().into_bits(), 0x0401);
}

#[test]
fn large_pools_switch_to_ldc_w() {
    let mut symbols = Symbols::default();
    let id = resolve(
        &mut symbols,
        Declaration::new("a.Crowded", DeclarationShape::Object)
            .with_annotation(Annotation::new(annotation::TRACKABLE).with_arg("trackWith", "late")),
    );
    let mut class = class_file(&symbols, id);
    for i in 0..200 {
        class.constants_mut().string(&format!("filler{i}")).unwrap();
    }
    generate(&symbols, id, &mut class).unwrap();

    let read = ClassFile::from_bytes(&class.to_bytes().unwrap()).unwrap();
    let code = read
        .method("track", ACCESSOR_DESCRIPTOR)
        .and_then(|method| method.code())
        .unwrap();
    let [Instr::LdcW(index), Instr::Areturn] = code.instrs() else {
        panic!("expected ldc_w, got {:?}", code.instrs());
    };
    assert!(*index > 255);
    assert_eq!(read.constants().string_at(*index), Some("late"));
}

#[test]
fn untracked_class_gets_nothing() {
    let mut symbols = Symbols::default();
    let id = resolve(
        &mut symbols,
        Declaration::new("a.Plain", DeclarationShape::Class),
    );
    let mut class = class_file(&symbols, id);
    generate(&symbols, id, &mut class).unwrap();

    assert!(class.methods().is_empty());
}

#[test]
fn synthetic_member_without_accessor_is_fatal() {
    let mut symbols = Symbols::default();
    let id = symbols
        .add_declaration(Declaration::new("a.Broken", DeclarationShape::Class))
        .unwrap();
    let flags = MemberFlags::new().with_is_public(true).with_is_synthetic(true);
    symbols
        .add_member(id, "track", Member::new(flags, "kotlin.String", None))
        .unwrap();
    let mut class = class_file(&symbols, id);

    let err = generate(&symbols, id, &mut class).unwrap_err();
    assert!(matches!(err, EmitError::MissingDescriptor { .. }));
    assert_eq!(
        err.to_string(),
        "a.Broken has a synthetic 'track' member with no registered accessor"
    );
    assert!(class.methods().is_empty());
}

#[test]
fn disabled_extension_emits_nothing() {
    let mut symbols = Symbols::default();
    let id = resolve(
        &mut symbols,
        Declaration::new("a.A", DeclarationShape::Class)
            .with_annotation(Annotation::new(annotation::TRACKABLE)),
    );
    let mut class = class_file(&symbols, id);

    TrackableCodegenExtension::new(Configuration::builder().enabled(false).build())
        .generate_class_syntax(&symbols, id, &mut class)
        .unwrap();
    assert!(class.methods().is_empty());
}
