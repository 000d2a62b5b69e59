use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

fn main() {
    println!("🔐 Admin session secret generator");
    println!("=================================");

    // 256-bit key for HS256
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);

    let base64_key = STANDARD.encode(key);

    println!();
    println!("Base64: {}", base64_key);
    println!("Hex:    {}", hex::encode(key));
    println!();
    println!("📝 Add this line to your .env file:");
    println!("JWT_SECRET={}", base64_key);
}
