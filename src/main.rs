#[actix_web::main]
async fn main() {
    if let Err(e) = genbi_lib::run().await {
        eprintln!("genbi: {}", e);
        std::process::exit(1);
    }
}
