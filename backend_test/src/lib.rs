use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that any test database is dropped regardless of how the test
/// terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::model::store::Storage` and `crate::mail::RecordingMailer`, the
/// latter two being the exact instances the client's server uses.
///
/// By default the storage is in memory. With `#[backend_test(mongo)]` it is a
/// freshly named MongoDB database at `ROCKET_DB_URI`; such tests are ignored
/// unless explicitly requested, since they need a running server.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Choose the storage backend.
    let use_mongo = match parse_macro_input!(args as Option<Ident>) {
        None => false,
        Some(arg) if arg == "mongo" => true,
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `mongo`")
                .into_compile_error()
                .into();
        }
    };
    let (maybe_ignore, store_setup) = if use_mongo {
        (
            quote! { #[ignore = "requires a MongoDB server at ROCKET_DB_URI"] },
            quote! {
                let db_name = crate::test_db_name();
                let store = crate::model::store::MongoStore::connect(&crate::test_db_uri(), &db_name)
                    .await
                    .unwrap();
                let db = Some(store.database().clone());
                let store = crate::model::store::Storage::new(store);
            },
        )
    } else {
        (
            quote! {},
            quote! {
                let db: Option<mongodb::Database> = None;
                let store = crate::model::store::Storage::new(
                    crate::model::store::MemoryStore::default(),
                );
            },
        )
    };

    // Rewrite the test function.
    quote! {
        #[test]
        #maybe_ignore
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::model::store::Storage,
                crate::mail::RecordingMailer,
                Option<mongodb::Database>,
            ) {
                #store_setup
                let mailer = crate::mail::RecordingMailer::default();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_store_and_mailer(store.clone(), mailer.clone()),
                )
                .await
                .unwrap();

                (rocket_client, store, mailer, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: Option<mongodb::Database>) {
                if let Some(db) = db {
                    db.drop(None).await.unwrap();
                }
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, store, mailer, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let store_mutex = std::sync::Mutex::new(store);
            let mailer_mutex = std::sync::Mutex::new(mailer);
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                #[allow(unused_variables)]
                let rocket_client = client_mutex.into_inner().unwrap();
                #[allow(unused_variables)]
                let store = store_mutex.into_inner().unwrap();
                #[allow(unused_variables)]
                let mailer = mailer_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                runtime.block_on(#new_name(#(#test_args),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, map each parameter to the dependency to
/// inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut has_mailer = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Valid as the last path segment for any type is itself.
                let type_ident = &type_path.path.segments.last().unwrap().ident;
                let (seen, arg, what) = if type_ident == "Client" {
                    (
                        &mut has_client,
                        quote! { rocket_client },
                        "`rocket::local::asynchronous::Client`",
                    )
                } else if type_ident == "Storage" {
                    (&mut has_store, quote! { store }, "`Storage`")
                } else if type_ident == "RecordingMailer" {
                    (&mut has_mailer, quote! { mailer }, "`RecordingMailer`")
                } else {
                    return Err(unexpected(input));
                };
                if *seen {
                    return Err(syn::Error::new(
                        input.span(),
                        format!("Test cannot accept more than one {what}"),
                    ));
                }
                *seen = true;
                args.push(arg);
                continue;
            }
        }

        return Err(unexpected(input));
    }

    Ok(args)
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `store_ident: Storage` or `mailer_ident: RecordingMailer`",
    )
}
